//! In-process gateway for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{GatewayError, OcrGateway, Upload};

type Responder = Box<dyn Fn(&Upload) -> Result<Value, GatewayError> + Send + Sync>;

pub struct StubGateway {
    responder: Responder,
    calls: AtomicUsize,
}

impl StubGateway {
    pub fn new(
        responder: impl Fn(&Upload) -> Result<Value, GatewayError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with the given text.
    pub fn text(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(Value::String(text.clone())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrGateway for StubGateway {
    async fn recognize(&self, upload: &Upload) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(upload)
    }

    fn backend(&self) -> &str {
        "stub"
    }
}
