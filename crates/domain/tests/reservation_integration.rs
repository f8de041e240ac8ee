//! Integration tests for the reservation service.
//!
//! These run the service against the in-memory store and check the seat
//! counter invariant under cancellation, batching, injected store failures,
//! and concurrent callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{ProfileId, ReservationId, TableId};
use domain::{
    CancelReserveRequest, ReservationService, ReservationState, ReserveError, ReserveRequest,
};
use table_store::{InMemoryReservationStore, ReservationStore, Restaurant, Table};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, 18, 0, 0).unwrap()
}

/// Creates a service over a fresh store with a restaurant and one table per
/// entry in `seats`, each starting the day after `fixed_now`.
async fn setup(seats: &[i32]) -> (ReservationService<InMemoryReservationStore>, Vec<Table>) {
    setup_at(seats, fixed_now() + Duration::days(1)).await
}

async fn setup_at(
    seats: &[i32],
    start_date: DateTime<Utc>,
) -> (ReservationService<InMemoryReservationStore>, Vec<Table>) {
    let store = InMemoryReservationStore::new();
    let restaurant = store
        .create_restaurant(Restaurant::new("Test Kitchen", fixed_now()))
        .await
        .unwrap();

    let mut tables = Vec::new();
    for (i, &n) in seats.iter().enumerate() {
        let table = store
            .create_table(Table::new(
                restaurant.id,
                Some(format!("T{}", i + 1)),
                n,
                start_date,
                fixed_now(),
            ))
            .await
            .unwrap();
        tables.push(table);
    }

    (
        ReservationService::new(store).with_clock(fixed_now),
        tables,
    )
}

fn reserve(table: &Table, seats: i32) -> ReserveRequest {
    ReserveRequest::new(table.restaurant_id, table.id, ProfileId::new(), seats)
}

fn cancel(table: &Table, id: ReservationId) -> CancelReserveRequest {
    CancelReserveRequest::new(table.restaurant_id, table.id, id, ProfileId::new())
}

async fn current(service: &ReservationService<InMemoryReservationStore>, table: &Table) -> Table {
    service
        .store()
        .fetch_table(table.restaurant_id, table.id)
        .await
        .unwrap()
        .unwrap()
}

mod reserve_table {
    use super::*;

    #[tokio::test]
    async fn reserves_seats_and_copies_start_date() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];

        let reservation = service.reserve_table(reserve(t1, 3)).await.unwrap();

        assert_eq!(reservation.num_seats, 3);
        assert_eq!(reservation.start_date, t1.start_date);
        assert_eq!(reservation.restaurant_id, t1.restaurant_id);
        assert_eq!(reservation.created_at, fixed_now());

        let table = current(&service, t1).await;
        assert_eq!(table.num_seats_reserved, 3);
        assert_eq!(table.remaining_seats(), 1);
        assert_eq!(table.updated_at, fixed_now());
    }

    #[tokio::test]
    async fn second_request_exceeding_remaining_is_rejected() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];

        service.reserve_table(reserve(t1, 3)).await.unwrap();
        let result = service.reserve_table(reserve(t1, 2)).await;

        assert!(matches!(
            result,
            Err(ReserveError::CapacityExceeded {
                requested: 2,
                available: 1
            })
        ));
        assert_eq!(current(&service, t1).await.num_seats_reserved, 3);
        assert_eq!(service.store().reservation_count().await, 1);
    }

    #[tokio::test]
    async fn filling_the_table_exactly_is_allowed() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];

        service.reserve_table(reserve(t1, 4)).await.unwrap();

        assert_eq!(current(&service, t1).await.remaining_seats(), 0);
        assert!(matches!(
            service.reserve_table(reserve(t1, 1)).await,
            Err(ReserveError::CapacityExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn past_table_is_rejected_without_writes() {
        let (service, tables) = setup_at(&[4], fixed_now() - Duration::seconds(1)).await;
        let t1 = &tables[0];

        let result = service.reserve_table(reserve(t1, 1)).await;

        assert!(matches!(result, Err(ReserveError::InvalidState(_))));
        assert_eq!(current(&service, t1).await, *t1);
        assert_eq!(service.store().reservation_count().await, 0);
    }

    #[tokio::test]
    async fn table_starting_now_is_reservable() {
        let (service, tables) = setup_at(&[4], fixed_now()).await;

        let reservation = service.reserve_table(reserve(&tables[0], 2)).await.unwrap();

        assert_eq!(reservation.start_date, fixed_now());
    }

    #[tokio::test]
    async fn table_of_another_restaurant_is_not_found() {
        let (service, tables) = setup(&[4]).await;
        let (_, other) = setup(&[4]).await;

        let result = service
            .reserve_table(ReserveRequest::new(
                tables[0].restaurant_id,
                other[0].id,
                ProfileId::new(),
                1,
            ))
            .await;

        assert!(result.as_ref().is_err_and(ReserveError::is_not_found));
    }
}

mod cancel_reservation {
    use super::*;

    #[tokio::test]
    async fn cancel_releases_seats() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        let first = service.reserve_table(reserve(t1, 3)).await.unwrap();

        service.cancel_reservation(cancel(t1, first.id)).await.unwrap();

        assert_eq!(current(&service, t1).await.num_seats_reserved, 0);
        service.reserve_table(reserve(t1, 4)).await.unwrap();
        assert_eq!(current(&service, t1).await.num_seats_reserved, 4);
    }

    #[tokio::test]
    async fn cancel_archives_under_the_same_id() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        let reservation = service.reserve_table(reserve(t1, 2)).await.unwrap();

        let canceled = service
            .cancel_reservation(cancel(t1, reservation.id))
            .await
            .unwrap();

        assert_eq!(canceled.id, reservation.id);
        assert_eq!(canceled.num_seats, reservation.num_seats);
        assert_eq!(canceled.profile_id, reservation.profile_id);
        assert_eq!(canceled.start_date, reservation.start_date);
        assert_eq!(service.store().reservation_count().await, 0);
        assert_eq!(service.store().canceled_count().await, 1);
        assert_eq!(
            service.reservation_state(reservation.id).await.unwrap(),
            Some(ReservationState::Cancelled)
        );
    }

    #[tokio::test]
    async fn second_cancel_is_not_found() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        let reservation = service.reserve_table(reserve(t1, 2)).await.unwrap();

        service
            .cancel_reservation(cancel(t1, reservation.id))
            .await
            .unwrap();
        let result = service.cancel_reservation(cancel(t1, reservation.id)).await;

        assert!(matches!(
            result,
            Err(ReserveError::NotFound {
                entity: "reservation",
                ..
            })
        ));
        assert_eq!(service.store().canceled_count().await, 1);
        assert_eq!(current(&service, t1).await.num_seats_reserved, 0);
    }

    #[tokio::test]
    async fn unknown_reservation_is_not_found() {
        let (service, tables) = setup(&[4]).await;

        let result = service
            .cancel_reservation(cancel(&tables[0], ReservationId::new()))
            .await;

        assert!(result.as_ref().is_err_and(ReserveError::is_not_found));
    }

    #[tokio::test]
    async fn reservation_of_another_table_is_not_found() {
        let (service, tables) = setup(&[4, 4]).await;
        let reservation = service.reserve_table(reserve(&tables[0], 2)).await.unwrap();

        let result = service
            .cancel_reservation(cancel(&tables[1], reservation.id))
            .await;

        assert!(result.as_ref().is_err_and(ReserveError::is_not_found));
        assert_eq!(current(&service, &tables[0]).await.num_seats_reserved, 2);
        assert_eq!(current(&service, &tables[1]).await.num_seats_reserved, 0);
    }

    #[tokio::test]
    async fn any_profile_may_cancel() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        let reservation = service.reserve_table(reserve(t1, 2)).await.unwrap();
        let other = ProfileId::new();
        assert_ne!(other, reservation.profile_id);

        let canceled = service
            .cancel_reservation(CancelReserveRequest::new(
                t1.restaurant_id,
                t1.id,
                reservation.id,
                other,
            ))
            .await
            .unwrap();

        assert_eq!(canceled.profile_id, reservation.profile_id);
        assert_eq!(current(&service, t1).await.num_seats_reserved, 0);
    }
}

mod reserve_tables {
    use super::*;

    #[tokio::test]
    async fn batch_reserves_every_table() {
        let (service, tables) = setup(&[4, 2]).await;

        let reservations = service
            .reserve_tables(vec![reserve(&tables[0], 3), reserve(&tables[1], 2)])
            .await
            .unwrap();

        assert_eq!(reservations.len(), 2);
        assert_eq!(reservations[0].table_id, tables[0].id);
        assert_eq!(reservations[1].table_id, tables[1].id);
        assert_eq!(current(&service, &tables[0]).await.num_seats_reserved, 3);
        assert_eq!(current(&service, &tables[1]).await.num_seats_reserved, 2);
    }

    #[tokio::test]
    async fn failing_element_rolls_back_the_whole_batch() {
        let (service, tables) = setup(&[4, 2]).await;

        let result = service
            .reserve_tables(vec![
                reserve(&tables[0], 3),
                reserve(&tables[1], 3),
                reserve(&tables[0], 1),
            ])
            .await;

        assert!(matches!(
            result,
            Err(ReserveError::CapacityExceeded {
                requested: 3,
                available: 2
            })
        ));
        assert_eq!(current(&service, &tables[0]).await.num_seats_reserved, 0);
        assert_eq!(current(&service, &tables[1]).await.num_seats_reserved, 0);
        assert_eq!(service.store().reservation_count().await, 0);
    }

    #[tokio::test]
    async fn later_elements_see_earlier_ones() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];

        let result = service
            .reserve_tables(vec![reserve(t1, 3), reserve(t1, 2)])
            .await;

        assert!(matches!(
            result,
            Err(ReserveError::CapacityExceeded { available: 1, .. })
        ));
        assert_eq!(current(&service, t1).await.num_seats_reserved, 0);
    }

    #[tokio::test]
    async fn first_error_wins() {
        let (service, tables) = setup(&[4]).await;

        let result = service
            .reserve_tables(vec![
                ReserveRequest::new(tables[0].restaurant_id, TableId::new(), ProfileId::new(), 1),
                reserve(&tables[0], 0),
            ])
            .await;

        assert!(matches!(
            result,
            Err(ReserveError::NotFound { entity: "table", .. })
        ));
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn failed_table_update_discards_the_reservation() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        service.store().set_fail_on_update_table(true);

        let result = service.reserve_table(reserve(t1, 2)).await;

        assert!(matches!(result, Err(ReserveError::Internal(_))));
        assert_eq!(service.store().reservation_count().await, 0);
        assert_eq!(current(&service, t1).await, *t1);

        service.store().set_fail_on_update_table(false);
        service.reserve_table(reserve(t1, 2)).await.unwrap();
        assert_eq!(current(&service, t1).await.num_seats_reserved, 2);
    }

    #[tokio::test]
    async fn failed_commit_discards_the_reservation() {
        let (service, tables) = setup(&[4]).await;
        service.store().set_fail_on_commit(true);

        let result = service.reserve_table(reserve(&tables[0], 2)).await;

        assert!(matches!(result, Err(ReserveError::Internal(_))));
        assert_eq!(service.store().reservation_count().await, 0);
        assert_eq!(current(&service, &tables[0]).await.num_seats_reserved, 0);
    }

    #[tokio::test]
    async fn failed_cancel_keeps_the_reservation_active() {
        let (service, tables) = setup(&[4]).await;
        let t1 = &tables[0];
        let reservation = service.reserve_table(reserve(t1, 2)).await.unwrap();
        service.store().set_fail_on_update_table(true);

        let result = service.cancel_reservation(cancel(t1, reservation.id)).await;

        assert!(matches!(result, Err(ReserveError::Internal(_))));
        assert_eq!(service.store().canceled_count().await, 0);
        assert_eq!(
            service.reservation_state(reservation.id).await.unwrap(),
            Some(ReservationState::Active)
        );
        assert_eq!(current(&service, t1).await.num_seats_reserved, 2);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_overbook() {
        let (service, tables) = setup(&[4]).await;
        let service = Arc::new(service);
        let t1 = tables[0].clone();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let service = Arc::clone(&service);
                let req = reserve(&t1, 1);
                tokio::spawn(async move { service.reserve_table(req).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(ReserveError::CapacityExceeded { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 4);
        let table = current(&service, &t1).await;
        assert_eq!(table.num_seats_reserved, 4);
        assert_eq!(service.store().reservation_count().await, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cancels_release_once() {
        let (service, tables) = setup(&[4]).await;
        let service = Arc::new(service);
        let t1 = tables[0].clone();
        let reservation = service.reserve_table(reserve(&t1, 3)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let req = cancel(&t1, reservation.id);
                tokio::spawn(async move { service.cancel_reservation(req).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(e.is_not_found(), "unexpected error: {e}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(current(&service, &t1).await.num_seats_reserved, 0);
        assert_eq!(service.store().canceled_count().await, 1);
    }

    static MOVING_NOW: AtomicI64 = AtomicI64::new(0);

    fn moving_now() -> DateTime<Utc> {
        Utc.timestamp_opt(MOVING_NOW.load(Ordering::SeqCst), 0)
            .single()
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_date_is_checked_after_waiting_for_the_table() {
        let start = fixed_now() + Duration::hours(1);
        MOVING_NOW.store((start - Duration::minutes(5)).timestamp(), Ordering::SeqCst);

        let (service, tables) = setup_at(&[4], start).await;
        let service = Arc::new(service.with_clock(moving_now));
        let t1 = tables[0].clone();

        let held = service.store().begin().await.unwrap();
        let waiting = {
            let service = Arc::clone(&service);
            let req = reserve(&t1, 1);
            tokio::spawn(async move { service.reserve_table(req).await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        MOVING_NOW.store((start + Duration::minutes(5)).timestamp(), Ordering::SeqCst);
        drop(held);

        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(ReserveError::InvalidState(_))));
        assert_eq!(current(&service, &t1).await.num_seats_reserved, 0);
    }
}

mod invariant {
    use super::*;

    /// Small deterministic generator so failures reproduce.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    #[tokio::test]
    async fn counter_stays_within_capacity_for_any_sequence() {
        for seed in 1..=5u64 {
            let (service, tables) = setup(&[4]).await;
            let t1 = &tables[0];
            let mut rng = Lcg(seed);
            let mut active: Vec<(ReservationId, i32)> = Vec::new();

            for _ in 0..200 {
                if active.is_empty() || rng.next(3) > 0 {
                    let seats = rng.next(4) as i32 + 1;
                    match service.reserve_table(reserve(t1, seats)).await {
                        Ok(r) => active.push((r.id, r.num_seats)),
                        Err(ReserveError::CapacityExceeded { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                } else {
                    let (id, _) = active.swap_remove(rng.next(active.len() as u64) as usize);
                    service.cancel_reservation(cancel(t1, id)).await.unwrap();
                }

                let table = current(&service, t1).await;
                assert!(table.is_consistent(), "seed {seed}: {table:?}");
                let held: i32 = active.iter().map(|(_, seats)| seats).sum();
                assert_eq!(table.num_seats_reserved, held, "seed {seed}");

                let stored: i32 = service
                    .store()
                    .reservations_for_table(t1.id)
                    .await
                    .iter()
                    .map(|r| r.num_seats)
                    .sum();
                assert_eq!(stored, held, "seed {seed}");
            }
        }
    }
}
