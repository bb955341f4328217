use std::fmt;
use std::sync::Arc;

use tokio::task::JoinError;

use crate::metadata::{HasMetadata, Metadata};

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shape of a [`Fault`] as seen by the default-level policy.
#[derive(Debug)]
pub enum FaultKind {
    /// An ordinary error with at most one inner cause.
    Simple { cause: Option<Arc<Fault>> },
    /// An aggregate wrapper. It exists only to carry its causes and is never
    /// classified itself.
    Composite { causes: Vec<Arc<Fault>> },
    /// Expected flow termination (task cancellation), not a fault.
    Cancelled,
}

/// An in-flight error.
///
/// Identity is the allocation: share it as `Arc<Fault>` between the code that
/// raises it, the raise handlers and whoever inspects it afterwards. Causes
/// are fixed at construction, so a fault tree cannot contain a cycle.
#[derive(Debug)]
pub struct Fault {
    message: String,
    kind: FaultKind,
    metadata: Metadata,
    source: Option<BoxedSource>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_parts(message.into(), FaultKind::Simple { cause: None }, None)
    }

    pub fn with_cause(message: impl Into<String>, cause: Arc<Fault>) -> Self {
        Self::from_parts(
            message.into(),
            FaultKind::Simple { cause: Some(cause) },
            None,
        )
    }

    /// Wrap an opaque third-party error. The message is taken from its
    /// `Display` output and the error is kept as the `source`.
    pub fn wrap<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_parts(
            error.to_string(),
            FaultKind::Simple { cause: None },
            Some(Box::new(error)),
        )
    }

    pub fn aggregate<I>(causes: I) -> Self
    where
        I: IntoIterator<Item = Arc<Fault>>,
    {
        let causes: Vec<_> = causes.into_iter().collect();
        let message = format!("One or more errors occurred ({} inner)", causes.len());
        Self::from_parts(message, FaultKind::Composite { causes }, None)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::from_parts(message.into(), FaultKind::Cancelled, None)
    }

    /// Convert a failed join. Cancellation becomes [`FaultKind::Cancelled`];
    /// a panic becomes a simple fault carrying the panic payload's text.
    pub fn from_join_error(error: JoinError) -> Self {
        if error.is_cancelled() {
            let message = error.to_string();
            return Self::from_parts(message, FaultKind::Cancelled, Some(Box::new(error)));
        }
        match error.try_into_panic() {
            Ok(payload) => {
                let text = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "<non-string panic payload>".to_string());
                Self::new(format!("task panicked: {text}"))
            }
            Err(error) => Self::wrap(error),
        }
    }

    fn from_parts(message: String, kind: FaultKind, source: Option<BoxedSource>) -> Self {
        Self {
            message,
            kind,
            metadata: Metadata::new(),
            source,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FaultKind::Composite { .. })
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind, FaultKind::Cancelled)
    }

    /// Inner causes: zero or one for simple faults, any number for composites.
    pub fn causes(&self) -> &[Arc<Fault>] {
        match &self.kind {
            FaultKind::Simple { cause } => cause.as_slice(),
            FaultKind::Composite { causes } => causes,
            FaultKind::Cancelled => &[],
        }
    }

    /// The first inner cause, if any.
    pub fn inner(&self) -> Option<&Arc<Fault>> {
        self.causes().first()
    }

    /// The wrapped third-party error, if this fault was built from one.
    pub fn opaque_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Downcast the wrapped third-party error.
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Some(source) = self.source.as_deref() {
            return Some(source);
        }
        self.inner()
            .map(|cause| cause.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl HasMetadata for Fault {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl From<std::io::Error> for Fault {
    fn from(value: std::io::Error) -> Self {
        Fault::wrap(value)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn simple_fault_has_at_most_one_cause() {
        let root = Arc::new(Fault::new("disk full"));
        let outer = Fault::with_cause("save failed", root.clone());
        assert_eq!(outer.causes().len(), 1);
        assert!(Arc::ptr_eq(outer.inner().unwrap(), &root));
        assert_eq!(outer.source().unwrap().to_string(), "disk full");
        assert!(!outer.is_composite());
    }

    #[test]
    fn aggregate_holds_every_cause() {
        let a = Arc::new(Fault::new("a"));
        let b = Arc::new(Fault::new("b"));
        let agg = Fault::aggregate([a.clone(), b.clone()]);
        assert!(agg.is_composite());
        assert_eq!(agg.causes().len(), 2);
        assert!(Arc::ptr_eq(&agg.causes()[1], &b));
        assert!(agg.message().contains("2 inner"));
    }

    #[test]
    fn wrap_keeps_opaque_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let fault = Fault::from(io);
        assert_eq!(fault.message(), "no such file");
        let io = fault.downcast_source::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        assert!(fault.source().is_some());
    }

    #[tokio::test]
    async fn join_errors_map_to_cancelled_or_simple() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });
        handle.abort();
        let err = handle.await.unwrap_err();
        let fault = Fault::from_join_error(err);
        assert!(fault.is_cancellation());
        assert!(fault.causes().is_empty());

        let handle = tokio::spawn(async {
            if true {
                panic!("boom");
            }
        });
        let err = handle.await.unwrap_err();
        let fault = Fault::from_join_error(err);
        assert!(!fault.is_cancellation());
        assert_eq!(fault.message(), "task panicked: boom");
    }
}
