//! Escenarios contra Postgres. Se saltean si `DATABASE_URL` no está definida.

mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use common::*;
use vti_backend::models::application::{ApplicationResult, ApplicationStatus, InspectionResult};
use vti_backend::models::inspection::DetailStatus;
use vti_backend::models::payment::PaymentStatus;
use vti_backend::models::sticker::{StickerRange, StickerStatus};
use vti_backend::models::person::PersonData;
use vti_backend::models::vehicle::VehicleData;
use vti_backend::services::application_service::DriverInput;
use vti_backend::services::{
    ApplicationService, ExpirationSweeper, InspectionService, PaymentService, QrService,
    StickerService,
};
use vti_backend::utils::errors::AppError;

fn vehicle_data(plate: &str) -> VehicleData {
    VehicleData {
        license_plate: plate.to_string(),
        brand: Some("Ford".to_string()),
        model: Some("Fiesta".to_string()),
        manufacture_year: Some(2015),
        vehicle_type: Some("Auto".to_string()),
        usage_type: Some("Particular".to_string()),
        fuel_type: None,
        engine_number: None,
        chassis_number: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_slot_is_consumed_once() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 1).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        ids.push(
            seed_application(
                pool,
                ApplicationSeed {
                    workshop_id,
                    user_id: ctx.user_id,
                    vehicle_id: None,
                    status: "queued",
                    result: None,
                    result_2: None,
                    consumed: false,
                    created_at: Utc::now(),
                },
            )
            .await,
        );
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let state = db.state.clone();
            let id = *id;
            tokio::spawn(async move { ApplicationService::new(&state).consume_slot(&ctx, id).await })
        })
        .collect();

    let mut successes = 0;
    let mut no_quota = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.newly_consumed);
                assert_eq!(outcome.available_inspections, 0);
                successes += 1;
            }
            Err(AppError::NoQuota) => no_quota += 1,
            Err(e) => panic!("error inesperado: {}", e),
        }
    }

    assert_eq!((successes, no_quota), (1, 1));
    assert_eq!(quota(pool, workshop_id).await, 0);
}

#[tokio::test]
async fn test_consume_slot_is_idempotent() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 3).await;
    let id = seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id: ctx.user_id,
            vehicle_id: None,
            status: "queued",
            result: None,
            result_2: None,
            consumed: false,
            created_at: Utc::now(),
        },
    )
    .await;

    let service = ApplicationService::new(&db.state);
    let first = service.consume_slot(&ctx, id).await.unwrap();
    let second = service.consume_slot(&ctx, id).await.unwrap();

    assert!(first.newly_consumed);
    assert!(!second.newly_consumed);
    assert_eq!(second.available_inspections, 2);
    assert_eq!(quota(pool, workshop_id).await, 2);
}

#[tokio::test]
async fn test_sticker_swap_releases_previous() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    add_member(pool, workshop_id, ctx.user_id).await;

    let (old_sticker, _) = seed_sticker(pool, workshop_id, "in_use", None).await;
    let (new_sticker, _) = seed_sticker(pool, workshop_id, "available", None).await;
    let (vehicle_id, plate) = seed_vehicle(pool, Some(old_sticker)).await;

    let service = ApplicationService::new(&db.state);
    let application = service.create(&ctx, workshop_id).await.unwrap();
    service
        .set_vehicle(&ctx, application.id, &vehicle_data(&plate), Some(new_sticker))
        .await
        .unwrap();

    assert_eq!(vehicle_sticker(pool, vehicle_id).await, Some(new_sticker));
    assert_eq!(sticker_state(pool, old_sticker).await.0, "available");
    assert_eq!(sticker_state(pool, new_sticker).await.0, "in_use");
}

#[tokio::test]
async fn test_sticker_of_other_vehicle_is_rejected() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;

    let (taken, _) = seed_sticker(pool, workshop_id, "in_use", None).await;
    seed_vehicle(pool, Some(taken)).await;

    let service = ApplicationService::new(&db.state);
    let application = service.create(&ctx, workshop_id).await.unwrap();
    let result = service
        .set_vehicle(&ctx, application.id, &vehicle_data(&random_plate()), Some(taken))
        .await;

    assert!(matches!(result, Err(AppError::StickerAlreadyAssigned(_))));
}

#[tokio::test]
async fn test_sweep_expires_conditional_and_revokes_sticker() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let (sticker_id, _) = seed_sticker(pool, workshop_id, "in_use", None).await;
    let (vehicle_id, _) = seed_vehicle(pool, Some(sticker_id)).await;

    let id = seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id: ctx.user_id,
            vehicle_id: Some(vehicle_id),
            status: "completed",
            result: Some("conditional"),
            result_2: None,
            consumed: true,
            created_at: Utc::now() - Duration::days(61),
        },
    )
    .await;

    let sweeper = ExpirationSweeper::new(pool.clone(), db.state.config.clone());
    let report = sweeper.run(Utc::now()).await.unwrap();
    assert!(report.expired >= 1);

    let (result, is_expired): (String, bool) =
        sqlx::query_as("SELECT result::text, is_expired FROM applications WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_eq!(result, "conditional_expired");
    assert!(is_expired);
    assert_eq!(sticker_state(pool, sticker_id).await, ("unavailable".to_string(), true));
    assert_eq!(vehicle_sticker(pool, vehicle_id).await, None);

    // Segunda corrida: nada que hacer para este trámite
    let before = application_row(pool, id).await;
    sweeper.run(Utc::now()).await.unwrap();
    assert_eq!(application_row(pool, id).await, before);
    assert_eq!(sticker_state(pool, sticker_id).await, ("unavailable".to_string(), true));
    assert_eq!(vehicle_sticker(pool, vehicle_id).await, None);
}

#[tokio::test]
async fn test_sweep_ignores_recent_and_reinspected() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;

    let recent = seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id: ctx.user_id,
            vehicle_id: None,
            status: "completed",
            result: Some("conditional"),
            result_2: None,
            consumed: true,
            created_at: Utc::now() - Duration::days(59),
        },
    )
    .await;
    let reinspected = seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id: ctx.user_id,
            vehicle_id: None,
            status: "completed",
            result: Some("conditional"),
            result_2: Some("apt"),
            consumed: true,
            created_at: Utc::now() - Duration::days(90),
        },
    )
    .await;

    ExpirationSweeper::new(pool.clone(), db.state.config.clone())
        .run(Utc::now())
        .await
        .unwrap();

    for id in [recent, reinspected] {
        let is_expired: bool =
            sqlx::query_scalar("SELECT is_expired FROM applications WHERE id = $1")
                .bind(id)
                .fetch_one(pool)
                .await
                .unwrap();
        assert!(!is_expired);
    }
}

#[tokio::test]
async fn test_payment_approval_credits_and_reversal_debits() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let admin = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 10).await;
    seed_zone_price(pool, "ZONA-TEST", Decimal::new(150000, 2)).await;

    let service = PaymentService::new(&db.state);
    let order = service
        .create(&admin, workshop_id, 250, "ZONA-TEST")
        .await
        .unwrap();
    assert_eq!(order.status, PaymentStatus::Pending);
    assert_eq!(order.amount, Decimal::new(37500000, 2));

    let in_review = service
        .admin_transition(&admin, order.id, PaymentStatus::InReview)
        .await
        .unwrap();
    assert_eq!(in_review.available_inspections, 10);

    let approved = service
        .admin_transition(&admin, order.id, PaymentStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.available_inspections, 260);

    // Repetir el mismo estado no vuelve a acreditar
    let again = service
        .admin_transition(&admin, order.id, PaymentStatus::Approved)
        .await
        .unwrap();
    assert_eq!(again.available_inspections, 260);

    let rejected = service
        .admin_transition(&admin, order.id, PaymentStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.previous_status, PaymentStatus::Approved);
    assert_eq!(quota(pool, workshop_id).await, 10);

    let reapproved = service
        .admin_transition(&admin, order.id, PaymentStatus::Approved)
        .await
        .unwrap();
    assert_eq!(reapproved.available_inspections, 260);
}

#[tokio::test]
async fn test_reversal_that_would_underflow_is_rejected() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let admin = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;
    seed_zone_price(pool, "ZONA-TEST", Decimal::new(150000, 2)).await;

    let service = PaymentService::new(&db.state);
    let order = service
        .create(&admin, workshop_id, 250, "ZONA-TEST")
        .await
        .unwrap();
    service
        .admin_transition(&admin, order.id, PaymentStatus::Approved)
        .await
        .unwrap();
    sqlx::query("UPDATE workshops SET available_inspections = 100 WHERE id = $1")
        .bind(workshop_id)
        .execute(pool)
        .await
        .unwrap();

    let result = service
        .admin_transition(&admin, order.id, PaymentStatus::Rejected)
        .await;
    assert!(matches!(result, Err(AppError::LedgerUnderflow { .. })));
    assert_eq!(quota(pool, workshop_id).await, 100);
}

#[tokio::test]
async fn test_qr_reports_second_inspection_result() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let (sticker_id, number) = seed_sticker(pool, workshop_id, "in_use", None).await;
    let (vehicle_id, plate) = seed_vehicle(pool, Some(sticker_id)).await;

    let id = seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id: ctx.user_id,
            vehicle_id: Some(vehicle_id),
            status: "completed",
            result: Some("conditional"),
            result_2: Some("apt"),
            consumed: true,
            created_at: Utc::now() - Duration::days(20),
        },
    )
    .await;
    seed_inspection(pool, id, false).await;
    let second = seed_inspection(pool, id, true).await;

    let data = QrService::new(pool.clone(), db.state.config.clone())
        .verify(&number.to_lowercase())
        .await
        .unwrap();

    let inspection = data.inspection.unwrap();
    assert_eq!(inspection.id, second);
    assert!(inspection.is_second);
    assert_eq!(inspection.result, Some(ApplicationResult::Apt));
    assert_eq!(data.car.unwrap().license_plate, plate);
    assert_eq!(data.workshop.unwrap().id, workshop_id);
}

#[tokio::test]
async fn test_qr_unknown_sticker_is_not_found() {
    let Some(db) = test_db().await else { return };
    let result = QrService::new(db.pool().clone(), db.state.config.clone())
        .verify("NO-EXISTE-000")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_full_application_flow_issues_certificate() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 5).await;
    add_member(pool, workshop_id, ctx.user_id).await;
    let (sticker_id, _) = seed_sticker(pool, workshop_id, "available", None).await;

    let service = ApplicationService::new(&db.state);
    let application = service.create(&ctx, workshop_id).await.unwrap();
    let id = application.id;

    let owner = PersonData {
        dni: format!("{}", 30_000_000 + (id.as_u128() % 9_000_000) as u64),
        first_name: "Ana".to_string(),
        last_name: "Pérez".to_string(),
        email: None,
        phone: None,
        street: None,
        city: None,
        province: None,
        postal_code: None,
    };
    service.set_owner(&ctx, id, &owner).await.unwrap();
    service
        .set_driver(&ctx, id, &DriverInput::SameAsOwner)
        .await
        .unwrap();
    service
        .set_vehicle(&ctx, id, &vehicle_data(&random_plate()), Some(sticker_id))
        .await
        .unwrap();

    // Sin cupo consumido no se puede finalizar
    let queued = service.enqueue(&ctx, id).await.unwrap();
    assert_eq!(queued.status, ApplicationStatus::Queued);
    service.start_inspection(&ctx, id).await.unwrap();
    assert!(matches!(
        service.finalize(&ctx, id, Some(InspectionResult::Apt)).await,
        Err(AppError::Conflict(_))
    ));

    service.consume_slot(&ctx, id).await.unwrap();
    let outcome = service
        .finalize(&ctx, id, Some(InspectionResult::Apt))
        .await
        .unwrap();

    assert_eq!(outcome.application.status, ApplicationStatus::Completed);
    assert_eq!(outcome.application.result, Some(ApplicationResult::Apt));
    assert_eq!(
        outcome.application.certificate_url.as_deref(),
        Some(outcome.certificate_url.as_str())
    );
    assert!(db
        .storage
        .contains("certificados", &format!("certificates/{}/certificado.pdf", id)));
    assert_eq!(quota(pool, workshop_id).await, 4);

    // Un trámite completado no se vuelve a finalizar
    assert!(service
        .finalize(&ctx, id, Some(InspectionResult::Apt))
        .await
        .is_err());
}

#[tokio::test]
async fn test_admin_release_makes_sticker_available() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let admin = seed_user(pool, true).await;
    let operator = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let (sticker_id, _) = seed_sticker(pool, workshop_id, "in_use", None).await;
    let (vehicle_id, _) = seed_vehicle(pool, Some(sticker_id)).await;

    let service = StickerService::new(pool.clone(), db.state.config.clone());
    assert!(matches!(
        service.release(&operator, sticker_id).await,
        Err(AppError::Forbidden(_))
    ));

    let sticker = service.release(&admin, sticker_id).await.unwrap();
    assert_eq!(sticker.status, StickerStatus::Available);
    assert_eq!(vehicle_sticker(pool, vehicle_id).await, None);
}


#[tokio::test]
async fn test_sticker_swap_retires_expired_previous() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    add_member(pool, workshop_id, ctx.user_id).await;

    let expired = Utc::now().date_naive() - Duration::days(5);
    let (old_sticker, _) = seed_sticker(pool, workshop_id, "in_use", Some(expired)).await;
    let (new_sticker, _) = seed_sticker(pool, workshop_id, "available", None).await;
    let (vehicle_id, plate) = seed_vehicle(pool, Some(old_sticker)).await;

    let service = ApplicationService::new(&db.state);
    let application = service.create(&ctx, workshop_id).await.unwrap();
    service
        .set_vehicle(&ctx, application.id, &vehicle_data(&plate), Some(new_sticker))
        .await
        .unwrap();

    assert_eq!(vehicle_sticker(pool, vehicle_id).await, Some(new_sticker));
    assert_eq!(sticker_state(pool, old_sticker).await.0, "unavailable");
    assert_eq!(sticker_state(pool, new_sticker).await.0, "in_use");
}

#[tokio::test]
async fn test_admin_release_of_expired_sticker_is_rejected() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let admin = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let expired = Utc::now().date_naive() - Duration::days(5);
    let (sticker_id, _) = seed_sticker(pool, workshop_id, "in_use", Some(expired)).await;
    let (vehicle_id, _) = seed_vehicle(pool, Some(sticker_id)).await;

    let result = StickerService::new(pool.clone(), db.state.config.clone())
        .release(&admin, sticker_id)
        .await;

    assert!(matches!(result, Err(AppError::StickerExpired(_))));
    assert_eq!(sticker_state(pool, sticker_id).await.0, "in_use");
    assert_eq!(vehicle_sticker(pool, vehicle_id).await, Some(sticker_id));
}

#[tokio::test]
async fn test_sticker_order_reports_duplicates_across_batches() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let admin = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let prefix = random_sticker_number();

    let service = StickerService::new(pool.clone(), db.state.config.clone());
    let first = service
        .create_order(
            &admin,
            workshop_id,
            &[],
            Some(&StickerRange {
                prefix: prefix.clone(),
                from: 1,
                to: 3,
                pad_width: 3,
            }),
            None,
        )
        .await
        .unwrap();
    assert_eq!(first.inserted.len(), 3);
    assert!(first.duplicates.is_empty());
    assert_eq!(first.order.amount, 3);

    let second = service
        .create_order(
            &admin,
            workshop_id,
            &[format!("{}003", prefix)],
            Some(&StickerRange {
                prefix: prefix.clone(),
                from: 2,
                to: 5,
                pad_width: 3,
            }),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        second.duplicates,
        vec![format!("{}003", prefix), format!("{}002", prefix)]
    );
    assert_eq!(
        second.inserted.len(),
        2,
        "solo {}004 y {}005 son nuevas",
        prefix,
        prefix
    );
    assert_eq!(second.order.amount, 2);
}

/// Trámite en cola con cupo consumido y vehículo con oblea en uso
async fn queued_application_with_sticker(db: &TestDb, workshop_id: Uuid, user_id: Uuid) -> Uuid {
    let pool = db.pool();
    let (sticker_id, _) = seed_sticker(pool, workshop_id, "in_use", None).await;
    let (vehicle_id, _) = seed_vehicle(pool, Some(sticker_id)).await;
    seed_application(
        pool,
        ApplicationSeed {
            workshop_id,
            user_id,
            vehicle_id: Some(vehicle_id),
            status: "queued",
            result: None,
            result_2: None,
            consumed: true,
            created_at: Utc::now(),
        },
    )
    .await
}

#[tokio::test]
async fn test_upsert_detail_rejects_step_of_other_workshop() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let other_workshop = seed_workshop(pool, 0).await;
    let step = seed_step(pool, workshop_id, 1).await;
    let foreign_step = seed_step(pool, other_workshop, 1).await;
    let id = queued_application_with_sticker(&db, workshop_id, ctx.user_id).await;

    ApplicationService::new(&db.state)
        .start_inspection(&ctx, id)
        .await
        .unwrap();

    let inspections = InspectionService::new(pool.clone());
    let detail = inspections
        .upsert_detail(&ctx, id, false, step, DetailStatus::Conditional, Some("luz baja"))
        .await
        .unwrap();
    assert_eq!(detail.status, DetailStatus::Conditional);

    // Segunda carga del mismo paso: se actualiza el mismo detalle
    let updated = inspections
        .upsert_detail(&ctx, id, false, step, DetailStatus::Apt, None)
        .await
        .unwrap();
    assert_eq!(updated.id, detail.id);
    assert_eq!(updated.status, DetailStatus::Apt);

    let result = inspections
        .upsert_detail(&ctx, id, false, foreign_step, DetailStatus::Apt, None)
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_checked_observations_are_replaced_and_validated() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 0).await;
    let other_workshop = seed_workshop(pool, 0).await;
    let step = seed_step(pool, workshop_id, 1).await;
    let other_step = seed_step(pool, workshop_id, 2).await;
    let foreign_step = seed_step(pool, other_workshop, 1).await;

    let first = seed_observation(pool, workshop_id, step).await;
    let second = seed_observation(pool, workshop_id, step).await;
    let of_other_step = seed_observation(pool, workshop_id, other_step).await;
    let of_other_workshop = seed_observation(pool, other_workshop, foreign_step).await;

    let id = queued_application_with_sticker(&db, workshop_id, ctx.user_id).await;
    ApplicationService::new(&db.state)
        .start_inspection(&ctx, id)
        .await
        .unwrap();

    let inspections = InspectionService::new(pool.clone());
    let detail = inspections
        .upsert_detail(&ctx, id, false, step, DetailStatus::Conditional, None)
        .await
        .unwrap();

    inspections
        .set_checked_observations(&ctx, detail.id, &[first, second, first])
        .await
        .unwrap();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(detail_observations(pool, detail.id).await, expected);

    // Reemplazo: la selección anterior no queda
    inspections
        .set_checked_observations(&ctx, detail.id, &[second])
        .await
        .unwrap();
    assert_eq!(detail_observations(pool, detail.id).await, vec![second]);

    for invalid in [of_other_step, of_other_workshop] {
        let result = inspections
            .set_checked_observations(&ctx, detail.id, &[second, invalid])
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
    assert_eq!(detail_observations(pool, detail.id).await, vec![second]);

    inspections
        .set_checked_observations(&ctx, detail.id, &[])
        .await
        .unwrap();
    assert!(detail_observations(pool, detail.id).await.is_empty());
}

#[tokio::test]
async fn test_finalize_derives_result_and_second_inspection_keeps_quota() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, true).await;
    let workshop_id = seed_workshop(pool, 7).await;
    let lights = seed_step(pool, workshop_id, 1).await;
    let brakes = seed_step(pool, workshop_id, 2).await;
    let id = queued_application_with_sticker(&db, workshop_id, ctx.user_id).await;

    let service = ApplicationService::new(&db.state);
    let inspections = InspectionService::new(pool.clone());

    // Sin pasos cargados no hay resultado que derivar
    service.start_inspection(&ctx, id).await.unwrap();
    assert!(matches!(
        service.finalize(&ctx, id, None).await,
        Err(AppError::BadRequest(_))
    ));

    inspections
        .upsert_detail(&ctx, id, false, lights, DetailStatus::Conditional, None)
        .await
        .unwrap();
    inspections
        .upsert_detail(&ctx, id, false, brakes, DetailStatus::Apt, None)
        .await
        .unwrap();

    let outcome = service.finalize(&ctx, id, None).await.unwrap();
    assert_eq!(outcome.result, InspectionResult::Conditional);
    assert_eq!(outcome.application.result, Some(ApplicationResult::Conditional));
    assert_eq!(outcome.application.status, ApplicationStatus::Completed);

    let second = service.start_second_inspection(&ctx, id).await.unwrap();
    assert!(second.is_second);
    // Iniciar de nuevo devuelve la misma reinspección
    assert_eq!(service.start_second_inspection(&ctx, id).await.unwrap().id, second.id);

    inspections
        .upsert_detail(&ctx, id, true, lights, DetailStatus::Apt, None)
        .await
        .unwrap();
    let reinspected = service.second_finalize(&ctx, id, None).await.unwrap();

    assert_eq!(reinspected.result, InspectionResult::Apt);
    assert_eq!(reinspected.application.result, Some(ApplicationResult::Conditional));
    assert_eq!(reinspected.application.result_2, Some(ApplicationResult::Apt));
    assert_eq!(
        reinspected.application.second_certificate_url.as_deref(),
        Some(reinspected.certificate_url.as_str())
    );
    assert!(db.storage.contains(
        "certificados",
        &format!("certificates/{}/certificado-segunda.pdf", id)
    ));
    assert_eq!(quota(pool, workshop_id).await, 7);

    // Con result_2 cargado ya no admite otra reinspección
    assert!(matches!(
        service.start_second_inspection(&ctx, id).await,
        Err(AppError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_soft_deleted_application_is_not_listed() {
    let Some(db) = test_db().await else { return };
    let pool = db.pool();
    let ctx = seed_user(pool, false).await;
    let workshop_id = seed_workshop(pool, 0).await;
    add_member(pool, workshop_id, ctx.user_id).await;

    let service = ApplicationService::new(&db.state);
    let kept = service.create(&ctx, workshop_id).await.unwrap();
    let deleted = service.create(&ctx, workshop_id).await.unwrap();
    service.soft_delete(&ctx, deleted.id).await.unwrap();

    let listed: Vec<_> = service
        .list(&ctx, workshop_id, None, None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(listed, vec![kept.id]);

    // Un trámite eliminado no admite más cambios
    assert!(service.enqueue(&ctx, deleted.id).await.is_err());
}
