use std::str::FromStr;
use std::sync::Mutex;

use axum::{extract::Request, middleware::Next, response::Response, Router};
use rust_decimal::Decimal;

use crate::features::auth::model::{AuthenticatedUser, Role};
use crate::features::notifications::models::NotificationEvent;
use crate::features::notifications::NotificationSink;
use crate::shared::geo::Coordinate;

pub fn coord(lat: &str, lon: &str) -> Coordinate {
    Coordinate::new(Decimal::from_str(lat).unwrap(), Decimal::from_str(lon).unwrap()).unwrap()
}

pub fn create_super_admin_user() -> AuthenticatedUser {
    AuthenticatedUser::new("test-super-admin", Role::SuperAdmin)
}

async fn inject_super_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_super_admin_user());
    next.run(request).await
}

pub fn with_super_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_super_admin_middleware))
}

/// Injects a fixed caller into every request, standing in for `auth_middleware`
pub fn with_user_auth(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

/// Sink that keeps every published event for assertions
#[derive(Default)]
pub struct RecordingNotificationSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, user_id: &str) -> Vec<NotificationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn publish(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}
