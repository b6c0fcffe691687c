use std::cell::Cell;
use std::rc::Rc;

use folio_core::host::{Event, EventKind, Host};
use folio_core::Result;
use tracing::error;

use super::{Controller, Subscriptions};

/// Logs uncaught runtime errors and unhandled rejections reported by the host
pub struct ErrorHook {
    subscriptions: Subscriptions,
    reported: Rc<Cell<usize>>,
}

impl ErrorHook {
    pub fn new(host: &Host) -> Result<Self> {
        let mut subscriptions = Subscriptions::new(host);
        let reported = Rc::new(Cell::new(0));

        let count = reported.clone();
        subscriptions.on(EventKind::Error, move |event| {
            if let Event::Error { message } = event {
                error!("Global error: {}", message);
                handle_error(message, &count);
            }
        });

        let count = reported.clone();
        subscriptions.on(EventKind::UnhandledRejection, move |event| {
            if let Event::UnhandledRejection { reason } = event {
                error!("Unhandled promise rejection: {}", reason);
                handle_error(reason, &count);
            }
        });

        Ok(Self {
            subscriptions,
            reported,
        })
    }

    /// Number of errors logged so far
    pub fn reported(&self) -> usize {
        self.reported.get()
    }
}

fn handle_error(error: &str, count: &Cell<usize>) {
    error!("Application error: {}", error);
    count.set(count.get() + 1);
}

impl Controller for ErrorHook {
    fn name(&self) -> &'static str {
        "errors"
    }

    fn teardown(&mut self) {
        self.subscriptions.release();
    }
}
