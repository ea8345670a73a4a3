//! Checkout: reservation intent + fresh order for the gateway UI

use shared::error::{AppError, ErrorCode};
use shared::models::{LedgerStatus, NotificationKind, PaymentAttempt};
use shared::payment::{CheckoutPayload, CheckoutResponse};
use shared::util::now_millis;

use super::{Reconciler, redirect_path};
use crate::db::ReservationCreate;
use crate::error::ServiceResult;
use crate::notify::NotifyRequest;

/// Globally unique order id: `rsv-{millis}-{12 hex}`
fn new_order_id(now: i64) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("rsv-{now}-{}", &random[..12])
}

impl Reconciler {
    pub async fn checkout(&self, user_id: &str, class_id: i64) -> ServiceResult<CheckoutResponse> {
        // 1. Fee snapshot for this operation
        let settings = self.settings.active_platform_settings().await?;

        // 2. Class must be open with a sane price
        let class = self
            .catalog
            .find_class(class_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ClassNotFound))?;
        if !class.is_bookable() {
            return Err(AppError::with_message(
                ErrorCode::ClassNotBookable,
                format!("Class is {}", class.status.as_db()),
            )
            .into());
        }
        if class.price < 0 {
            return Err(AppError::new(ErrorCode::ClassInvalidPrice).into());
        }

        // 3. Settled reservations short-circuit without a new order
        if let Some(existing) = self.ledger.find_reservation(class_id, user_id).await?
            && existing.is_settled()
        {
            return Ok(CheckoutResponse::already_confirmed(existing.id));
        }

        // Priced checkout needs credentials; refuse before any write
        let client_key = if class.price > 0 {
            let client_key = self
                .checkout
                .client_key
                .clone()
                .filter(|_| self.gateway.is_some())
                .ok_or_else(|| {
                    tracing::error!(class_id, "Payment gateway credentials are not configured");
                    AppError::with_message(
                        ErrorCode::PaymentSetupFailed,
                        "Payment gateway is not configured",
                    )
                })?;
            Some(client_key)
        } else {
            None
        };

        let now = now_millis();
        let (reservation, created) = self
            .ledger
            .create_reservation(&ReservationCreate {
                class_id,
                user_id: user_id.to_string(),
                amount: class.price,
                now,
            })
            .await?;
        if reservation.is_settled() {
            return Ok(CheckoutResponse::already_confirmed(reservation.id));
        }

        // 4. Free: confirmed on the spot, no gateway
        let Some(client_key) = client_key else {
            if !self.ledger.confirm_reservation(reservation.id, now).await? {
                return Ok(CheckoutResponse::already_confirmed(reservation.id));
            }
            tracing::info!(
                reservation_id = reservation.id,
                class_id,
                user_id = %user_id,
                "Free reservation confirmed"
            );
            self.notifier
                .notify(
                    NotifyRequest::new(&class.coach_id, NotificationKind::Reservation, "New reservation")
                        .actor(user_id)
                        .body(format!("A spot in {} was reserved.", class.title))
                        .deep_link(redirect_path(class_id))
                        .dedupe_key(format!(
                            "reservation-confirmed:{}:{}",
                            reservation.id, class.coach_id
                        )),
                )
                .await;
            return Ok(CheckoutResponse::free(reservation.id));
        };

        // 5. Priced: fresh `ready` ledger row, then point the reservation at it
        let order_id = new_order_id(now);
        self.ledger
            .insert_attempt(&PaymentAttempt {
                order_id: order_id.clone(),
                reservation_id: reservation.id,
                user_id: user_id.to_string(),
                class_id,
                amount: class.price,
                platform_fee: settings.class_fee(class.price),
                status: LedgerStatus::Ready,
                payment_key: None,
                method: None,
                approved_at: None,
                failure_code: None,
                failure_message: None,
                metadata: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        if !self
            .ledger
            .begin_payment(reservation.id, &order_id, class.price, now)
            .await?
        {
            // Settled between the read above and now
            self.ledger
                .mark_attempt_closed(
                    &order_id,
                    LedgerStatus::Cancelled,
                    Some("ALREADY_CONFIRMED"),
                    None,
                    None,
                    now,
                )
                .await?;
            return Ok(CheckoutResponse::already_confirmed(reservation.id));
        }
        tracing::info!(
            order_id = %order_id,
            reservation_id = reservation.id,
            amount = class.price,
            created,
            "Checkout order allocated"
        );

        // 6. Only the first request notifies the coach
        if created {
            self.notifier
                .notify(
                    NotifyRequest::new(&class.coach_id, NotificationKind::Reservation, "New reservation request")
                        .actor(user_id)
                        .body(format!("A reservation for {} is awaiting payment.", class.title))
                        .deep_link(redirect_path(class_id))
                        .dedupe_key(format!(
                            "reservation-requested:{}:{}",
                            reservation.id, class.coach_id
                        )),
                )
                .await;
        }

        // 7. Payload for the gateway UI
        let profile = self.catalog.find_profile(user_id).await?;
        let base = self.checkout.app_base_url.trim_end_matches('/');
        Ok(CheckoutResponse::pending(
            reservation.id,
            CheckoutPayload {
                amount: class.price,
                order_id,
                order_name: class.title,
                customer_name: profile.as_ref().and_then(|p| p.display_name.clone()),
                customer_email: profile.and_then(|p| p.email),
                success_url: format!("{base}/payments/success"),
                fail_url: format!("{base}/payments/fail"),
                gateway_client_key: client_key,
            },
        ))
    }
}
