//! `PostgresTicketStore`: the production `TicketStore`.

use crate::error::map_sqlx_error;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use ticketing_core::error::StoreError;
use ticketing_core::store::{BoxFuture, ReservationSnapshot, TicketStore, TicketTransaction};
use ticketing_core::types::{
    Event, EventAvailability, EventId, LockStrategy, Reservation, ReservationId, Ticket, TicketId,
    TicketStatus, UserId,
};
use uuid::Uuid;

/// Eligibility predicate over `tickets t`, parameterised by `$2 = now`.
///
/// The expiry check is a correlated subquery rather than a join so that, after
/// waiting on a row lock, Postgres re-evaluates it against the winner's
/// committed row: a ticket the winner re-bound to a fresh reservation is no
/// longer eligible.
macro_rules! eligible_predicate {
    () => {
        "(t.status = 'available'
          OR (t.status = 'held' AND EXISTS (
                SELECT 1 FROM reservations r
                WHERE r.id = t.reservation_id AND r.expires_at <= $2)))"
    };
}

macro_rules! lock_candidates_sql {
    ($suffix:literal) => {
        concat!(
            "SELECT t.id FROM tickets t WHERE t.event_id = $1 AND ",
            eligible_predicate!(),
            " ORDER BY t.ticket_number LIMIT $3 ",
            $suffix
        )
    };
}

const LOCK_CANDIDATES_WAIT: &str = lock_candidates_sql!("FOR UPDATE");
const LOCK_CANDIDATES_SKIP_LOCKED: &str = lock_candidates_sql!("FOR UPDATE SKIP LOCKED");

const EVENT_AVAILABILITY: &str = concat!(
    "SELECT e.id, e.name, e.date, e.capacity,
            (SELECT COUNT(*) FROM tickets t WHERE t.event_id = e.id AND ",
    eligible_predicate!(),
    ") AS available
     FROM events e
     WHERE e.id = $1"
);

type EventRow = (Uuid, String, DateTime<Utc>, i32);
type TicketRow = (Uuid, Uuid, i32, String, Option<Uuid>);
type ReservationRow = (Uuid, String, Uuid, i32, DateTime<Utc>, DateTime<Utc>);

fn to_u32(value: i64, what: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} out of range: {value}")))
}

fn to_i32(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Database(format!("{what} exceeds i32::MAX: {value}")))
}

fn event_from_row((id, name, date, capacity): EventRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: EventId::from_uuid(id),
        name,
        date,
        capacity: to_u32(i64::from(capacity), "capacity")?,
    })
}

fn ticket_from_row(
    (id, event_id, ticket_number, status, reservation_id): TicketRow,
) -> Result<Ticket, StoreError> {
    Ok(Ticket {
        id: TicketId::from_uuid(id),
        event_id: EventId::from_uuid(event_id),
        ticket_number: to_u32(i64::from(ticket_number), "ticket_number")?,
        status: TicketStatus::parse(&status)?,
        reservation_id: reservation_id.map(ReservationId::from_uuid),
    })
}

fn reservation_from_row(
    (id, user_id, event_id, ticket_count, created_at, expires_at): ReservationRow,
) -> Result<Reservation, StoreError> {
    Ok(Reservation {
        id: ReservationId::from_uuid(id),
        user_id: UserId::parse(user_id)
            .map_err(|_| StoreError::Corrupt(format!("blank user_id on reservation {id}")))?,
        event_id: EventId::from_uuid(event_id),
        ticket_count: to_u32(i64::from(ticket_count), "ticket_count")?,
        created_at,
        expires_at,
    })
}

/// `PostgreSQL`-backed ticket store.
///
/// Cheap to clone (wraps a connection pool).
///
/// # Example
///
/// ```no_run
/// use ticketing_postgres::PostgresTicketStore;
/// use std::time::Duration;
///
/// # async fn example(pool: sqlx::PgPool) {
/// let store = PostgresTicketStore::from_pool(pool)
///     .with_lock_timeout(Some(Duration::from_secs(5)));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresTicketStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresTicketStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(map_sqlx_error)?;
        Ok(Self::from_pool(pool))
    }

    /// Connect with explicit pool sizing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the connection fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bound how long a transaction waits for row locks. `None` waits forever.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Option<Duration>) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }
}

impl TicketStore for PostgresTicketStore {
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn TicketTransaction>, StoreError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

            if let Some(timeout) = self.lock_timeout {
                sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                    .bind(format!("{}ms", timeout.as_millis()))
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }

            Ok(Box::new(PostgresTicketTransaction { tx }) as Box<dyn TicketTransaction>)
        })
    }

    fn event_availability(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<EventAvailability>, StoreError>> {
        Box::pin(async move {
            let row: Option<(Uuid, String, DateTime<Utc>, i32, i64)> =
                sqlx::query_as(EVENT_AVAILABILITY)
                    .bind(event_id.as_uuid())
                    .bind(now)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

            row.map(|(id, name, date, capacity, available)| {
                Ok(EventAvailability {
                    event: event_from_row((id, name, date, capacity))?,
                    available_count: to_u32(available, "available count")?,
                })
            })
            .transpose()
        })
    }

    fn list_events(&self) -> BoxFuture<'_, Result<Vec<Event>, StoreError>> {
        Box::pin(async move {
            let rows: Vec<EventRow> = sqlx::query_as(
                "SELECT id, name, date, capacity FROM events ORDER BY date DESC, id",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            rows.into_iter().map(event_from_row).collect()
        })
    }

    fn reservation_snapshot(
        &self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<ReservationSnapshot>, StoreError>> {
        Box::pin(async move {
            let row: Option<ReservationRow> = sqlx::query_as(
                "SELECT id, user_id, event_id, ticket_count, created_at, expires_at
                 FROM reservations WHERE id = $1",
            )
            .bind(reservation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            let Some(row) = row else {
                return Ok(None);
            };

            let tickets: Vec<TicketRow> = sqlx::query_as(
                "SELECT id, event_id, ticket_number, status, reservation_id
                 FROM tickets WHERE reservation_id = $1 ORDER BY ticket_number",
            )
            .bind(reservation_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            let tickets = tickets
                .into_iter()
                .map(ticket_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some((reservation_from_row(row)?, tickets)))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            Ok(())
        })
    }
}

/// One open Postgres transaction. Rolled back by sqlx if dropped.
struct PostgresTicketTransaction {
    tx: Transaction<'static, Postgres>,
}

impl TicketTransaction for PostgresTicketTransaction {
    fn insert_event(&mut self, event: Event) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("INSERT INTO events (id, name, date, capacity) VALUES ($1, $2, $3, $4)")
                .bind(event.id.as_uuid())
                .bind(&event.name)
                .bind(event.date)
                .bind(to_i32(event.capacity, "capacity")?)
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;
            Ok(())
        })
    }

    fn insert_tickets(&mut self, tickets: Vec<Ticket>) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            if tickets.iter().any(|t| t.reservation_id.is_some()) {
                return Err(StoreError::Database(
                    "provisioned tickets must not be bound to a reservation".to_string(),
                ));
            }

            let mut ids = Vec::with_capacity(tickets.len());
            let mut event_ids = Vec::with_capacity(tickets.len());
            let mut numbers = Vec::with_capacity(tickets.len());
            let mut statuses = Vec::with_capacity(tickets.len());
            for ticket in &tickets {
                ids.push(*ticket.id.as_uuid());
                event_ids.push(*ticket.event_id.as_uuid());
                numbers.push(to_i32(ticket.ticket_number, "ticket_number")?);
                statuses.push(ticket.status.as_str().to_string());
            }

            // One statement regardless of capacity.
            sqlx::query(
                "INSERT INTO tickets (id, event_id, ticket_number, status)
                 SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::int4[], $4::text[])",
            )
            .bind(ids)
            .bind(event_ids)
            .bind(numbers)
            .bind(statuses)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
            Ok(())
        })
    }

    fn event_exists(&mut self, event_id: EventId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                    .bind(event_id.as_uuid())
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(map_sqlx_error)?;
            Ok(exists)
        })
    }

    fn lock_eligible_tickets(
        &mut self,
        event_id: EventId,
        now: DateTime<Utc>,
        limit: u32,
        strategy: LockStrategy,
    ) -> BoxFuture<'_, Result<Vec<TicketId>, StoreError>> {
        Box::pin(async move {
            let sql = match strategy {
                LockStrategy::Wait => LOCK_CANDIDATES_WAIT,
                LockStrategy::SkipLocked => LOCK_CANDIDATES_SKIP_LOCKED,
            };

            let rows: Vec<(Uuid,)> = sqlx::query_as(sql)
                .bind(event_id.as_uuid())
                .bind(now)
                .bind(i64::from(limit))
                .fetch_all(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(rows.into_iter().map(|(id,)| TicketId::from_uuid(id)).collect())
        })
    }

    fn insert_reservation(
        &mut self,
        reservation: Reservation,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO reservations (id, user_id, event_id, ticket_count, created_at, expires_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.user_id.as_str())
            .bind(reservation.event_id.as_uuid())
            .bind(to_i32(reservation.ticket_count, "ticket_count")?)
            .bind(reservation.created_at)
            .bind(reservation.expires_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
            Ok(())
        })
    }

    fn hold_tickets(
        &mut self,
        reservation_id: ReservationId,
        ticket_ids: Vec<TicketId>,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = ticket_ids.iter().map(|id| *id.as_uuid()).collect();
            let result = sqlx::query(
                "UPDATE tickets SET status = 'held', reservation_id = $1 WHERE id = ANY($2)",
            )
            .bind(reservation_id.as_uuid())
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
            Ok(result.rows_affected())
        })
    }

    fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Option<Reservation>, StoreError>> {
        Box::pin(async move {
            let row: Option<ReservationRow> = sqlx::query_as(
                "SELECT id, user_id, event_id, ticket_count, created_at, expires_at
                 FROM reservations WHERE id = $1",
            )
            .bind(reservation_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

            row.map(reservation_from_row).transpose()
        })
    }

    fn lock_reservation_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>> {
        Box::pin(async move {
            let rows: Vec<TicketRow> = sqlx::query_as(
                "SELECT id, event_id, ticket_number, status, reservation_id
                 FROM tickets
                 WHERE reservation_id = $1
                 ORDER BY ticket_number
                 FOR UPDATE",
            )
            .bind(reservation_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

            rows.into_iter().map(ticket_from_row).collect()
        })
    }

    fn sell_tickets(
        &mut self,
        reservation_id: ReservationId,
    ) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE tickets SET status = 'sold'
                 WHERE reservation_id = $1 AND status = 'held'",
            )
            .bind(reservation_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
            Ok(result.rows_affected())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let Self { tx } = *self;
        Box::pin(async move { tx.commit().await.map_err(map_sqlx_error) })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let Self { tx } = *self;
        Box::pin(async move { tx.rollback().await.map_err(map_sqlx_error) })
    }
}
