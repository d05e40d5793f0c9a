//! Admission control and order lifecycle against the in-memory store.

mod common;

use common::{after_event, event_date, new_event, order, today, Fixture};
use city_events::error::ReservationError;
use city_events::models::{CustomerId, EventId, OrderId, OrderQuery};

#[tokio::test]
async fn orders_consume_capacity_until_sold_out() {
    let fx = Fixture::with_capacity(5);

    fx.service.create_order(&fx.request(fx.anna, 3)).await.unwrap();
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 2);

    let err = fx
        .service
        .create_order(&fx.request(fx.boris, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Conflict(_)), "got {err:?}");
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 2);

    fx.service.create_order(&fx.request(fx.boris, 2)).await.unwrap();
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 0);

    let availability = fx.service.get_availability(fx.event, None).await.unwrap();
    assert_eq!(availability.capacity, 5);
    assert_eq!(availability.sold, 5);
    assert_eq!(availability.available, 0);
    assert_eq!(availability.scheduled_date, event_date());
}

#[tokio::test]
async fn order_dated_after_event_is_rejected_even_with_free_seats() {
    let fx = Fixture::with_capacity(100);

    let err = fx
        .service
        .create_order(&order(fx.event, fx.anna, 1, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InvalidState(_)), "got {err:?}");
    assert!(fx.store().orders().is_empty());

    // the event's own moment is still acceptable
    fx.service
        .create_order(&order(fx.event, fx.anna, 1, event_date()))
        .await
        .unwrap();
}

#[tokio::test]
async fn validation_runs_in_documented_order() {
    let fx = Fixture::with_capacity(1);
    let ghost_event = EventId(9_999);
    let ghost_customer = CustomerId(9_998);

    // ticket count before anything touches storage
    let err = fx
        .service
        .create_order(&order(ghost_event, ghost_customer, 0, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InvalidArgument(_)), "got {err:?}");

    let err = fx
        .service
        .create_order(&order(ghost_event, ghost_customer, 5, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound("event")), "got {err:?}");

    let err = fx
        .service
        .create_order(&order(fx.event, ghost_customer, 5, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound("customer")), "got {err:?}");

    let err = fx
        .service
        .create_order(&order(fx.event, fx.anna, 5, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InvalidState(_)), "got {err:?}");

    let err = fx
        .service
        .create_order(&order(fx.event, fx.anna, 5, today()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Conflict(_)), "got {err:?}");

    assert!(fx.store().orders().is_empty());
}

#[tokio::test]
async fn edit_is_checked_without_its_own_tickets() {
    let fx = Fixture::with_capacity(10);
    let mine = fx.service.create_order(&fx.request(fx.anna, 3)).await.unwrap();
    fx.service.create_order(&fx.request(fx.boris, 4)).await.unwrap();

    let excluding = fx.service.get_availability(fx.event, Some(mine)).await.unwrap();
    assert_eq!(excluding.available, 6);

    fx.service
        .update_order(mine, &fx.request(fx.anna, 5))
        .await
        .unwrap();
    assert_eq!(fx.service.get_order(mine).await.unwrap().ticket_count, 5);

    let err = fx
        .service
        .update_order(mine, &fx.request(fx.anna, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Conflict(_)), "got {err:?}");
    assert_eq!(fx.service.get_order(mine).await.unwrap().ticket_count, 5);
    assert_eq!(fx.sold(), 9);
}

#[tokio::test]
async fn keeping_the_same_count_on_a_full_event_succeeds() {
    let fx = Fixture::with_capacity(4);
    let id = fx.service.create_order(&fx.request(fx.anna, 4)).await.unwrap();

    let mut edit = fx.request(fx.boris, 4);
    edit.order_date = today() - chrono::Duration::days(1);
    fx.service.update_order(id, &edit).await.unwrap();

    let stored = fx.service.get_order(id).await.unwrap();
    assert_eq!(stored.customer_id, fx.boris);
    assert_eq!(stored.order_date, edit.order_date);
}

#[tokio::test]
async fn moving_an_order_frees_the_old_event() {
    let fx = Fixture::with_capacity(3);
    let opera = fx.store().insert_event(new_event("Opera Gala", 2));
    let id = fx.service.create_order(&fx.request(fx.anna, 3)).await.unwrap();

    let err = fx
        .service
        .update_order(id, &order(opera, fx.anna, 3, today()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Conflict(_)), "got {err:?}");

    fx.service
        .update_order(id, &order(opera, fx.anna, 2, today()))
        .await
        .unwrap();
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 3);
    assert_eq!(fx.service.query_available_tickets(opera).await.unwrap(), 0);
}

#[tokio::test]
async fn update_reports_missing_order_first() {
    let fx = Fixture::with_capacity(3);

    let err = fx
        .service
        .update_order(OrderId(424_242), &fx.request(fx.anna, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound("order")), "got {err:?}");

    let id = fx.service.create_order(&fx.request(fx.anna, 1)).await.unwrap();
    let err = fx
        .service
        .update_order(id, &fx.request(fx.anna, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InvalidArgument(_)), "got {err:?}");

    let err = fx
        .service
        .update_order(id, &order(EventId(77_777), fx.anna, 1, today()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound("event")), "got {err:?}");

    let err = fx
        .service
        .update_order(id, &order(fx.event, fx.anna, 1, after_event()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let fx = Fixture::with_capacity(2);
    let id = fx.service.create_order(&fx.request(fx.anna, 2)).await.unwrap();
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 0);

    assert!(fx.service.cancel_order(id).await.unwrap());
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 2);

    assert!(!fx.service.cancel_order(id).await.unwrap());
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 2);
    assert!(matches!(
        fx.service.get_order(id).await,
        Err(ReservationError::NotFound("order"))
    ));
}

#[tokio::test]
async fn lowered_capacity_shows_zero_and_blocks_orders() {
    let fx = Fixture::with_capacity(6);
    fx.service.create_order(&fx.request(fx.anna, 5)).await.unwrap();

    assert!(fx.store().set_capacity(fx.event, 3));
    let availability = fx.service.get_availability(fx.event, None).await.unwrap();
    assert_eq!(availability.available, -2);
    assert_eq!(fx.service.query_available_tickets(fx.event).await.unwrap(), 0);
    let details = fx.service.event_details(fx.event).await.unwrap();
    assert_eq!(details.available_tickets, 0);

    let err = fx
        .service
        .create_order(&fx.request(fx.boris, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn unknown_event_availability_is_not_found_but_details_are_empty() {
    let fx = Fixture::with_capacity(1);

    let err = fx
        .service
        .query_available_tickets(EventId(31_337))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotFound("event")), "got {err:?}");

    let details = fx.service.event_details(EventId(31_337)).await.unwrap();
    assert_eq!(details.available_tickets, 0);
    assert!(details.event_date.is_none());

    let details = fx.service.event_details(fx.event).await.unwrap();
    assert_eq!(details.available_tickets, 1);
    assert_eq!(details.event_date, Some(event_date()));
}

#[tokio::test]
async fn committed_orders_show_up_in_listing() {
    let fx = Fixture::with_capacity(10);
    let first = fx.service.create_order(&fx.request(fx.anna, 1)).await.unwrap();
    fx.service.create_order(&fx.request(fx.boris, 6)).await.unwrap();

    let page = fx
        .service
        .list_orders(&OrderQuery {
            customer_name: Some("petrova".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].id, first);
    assert_eq!(page.items[0].event_name, "Philharmonic Winter Concert");

    fx.service.cancel_order(first).await.unwrap();
    let page = fx.service.list_orders(&OrderQuery::default()).await.unwrap();
    assert_eq!(page.total_count, 1);
}

#[tokio::test]
async fn search_is_prefix_based_and_empty_term_finds_nothing() {
    let fx = Fixture::with_capacity(1);
    fx.store().insert_event(new_event("Philharmonic Spring Gala", 10));

    let found = fx.service.search_events("Philharmonic").await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(fx.service.search_events("").await.unwrap().is_empty());
    assert!(fx.service.search_events("Concert").await.unwrap().is_empty());
}
