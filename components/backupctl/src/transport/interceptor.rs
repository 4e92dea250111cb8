//! Call middleware for every RPC made on a [`Connection`](super::connection::Connection).
//!
//! tonic runs an [`Interceptor`] on the request metadata before both unary and
//! streaming calls are dispatched, so one chain covers every method of the API.
//! Layers run in the order they were added; each one receives the request the
//! previous layer produced and hands its result to the next. A layer that
//! returns `Err` aborts the call before anything is sent.

// Local crates
use crate::helpers::errors::{ClientError, ClientResult};

// External crates
use std::fmt;
use std::sync::Arc;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};

pub const AUTHORIZATION_HEADER: &str = "authorization";

/// One step of the call chain
pub trait CallLayer: fmt::Debug + Send + Sync {
    fn apply(&self, request: Request<()>) -> Result<Request<()>, Status>;
}

/// Attaches `authorization: bearer <token>` to every outgoing call.
///
/// The header is sent even for an empty token (`bearer `), so the coordinator
/// always sees the same request shape.
#[derive(Clone)]
pub struct CredentialLayer {
    header: MetadataValue<Ascii>,
}

impl CredentialLayer {
    pub fn new(token: &str) -> ClientResult<Self> {
        let header = format!("bearer {token}")
            .parse::<MetadataValue<Ascii>>()
            .map_err(|e| ClientError::Credential {
                origin: "api token".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { header })
    }
}

// Keep the token out of logs.
impl fmt::Debug for CredentialLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialLayer").finish_non_exhaustive()
    }
}

impl CallLayer for CredentialLayer {
    fn apply(&self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(AUTHORIZATION_HEADER, self.header.clone());
        Ok(request)
    }
}

/// Fixed-order composition of [`CallLayer`]s, cheap to clone into every client.
#[derive(Debug, Clone, Default)]
pub struct CallChain {
    layers: Arc<Vec<Arc<dyn CallLayer>>>,
}

impl CallChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer; it runs after every layer already in the chain.
    #[must_use]
    pub fn with_layer(self, layer: impl CallLayer + 'static) -> Self {
        let mut layers: Vec<_> = self.layers.iter().cloned().collect();
        layers.push(Arc::new(layer));
        Self {
            layers: Arc::new(layers),
        }
    }

    /// The chain every connection uses: just the credential layer today.
    pub fn for_token(token: &str) -> ClientResult<Self> {
        Ok(Self::new().with_layer(CredentialLayer::new(token)?))
    }
}

impl Interceptor for CallChain {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        self.layers
            .iter()
            .try_fold(request, |request, layer| layer.apply(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(request: &Request<()>) -> Option<&str> {
        request
            .metadata()
            .get(AUTHORIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn injects_bearer_token() {
        let mut chain = CallChain::for_token("s3cr3t").unwrap();
        let request = chain.call(Request::new(())).unwrap();
        assert_eq!(header(&request), Some("bearer s3cr3t"));
    }

    #[test]
    fn empty_token_still_sends_header() {
        let mut chain = CallChain::for_token("").unwrap();
        let request = chain.call(Request::new(())).unwrap();
        assert_eq!(header(&request), Some("bearer "));
    }

    #[test]
    fn other_metadata_is_untouched() {
        let mut chain = CallChain::for_token("t").unwrap();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("x-request-id", "abc".parse().unwrap());

        let request = chain.call(request).unwrap();
        assert_eq!(
            request.metadata().get("x-request-id").unwrap().to_str().unwrap(),
            "abc"
        );
        assert_eq!(header(&request), Some("bearer t"));
    }

    #[test]
    fn token_with_control_characters_is_rejected() {
        let err = CallChain::for_token("bad\ntoken").unwrap_err();
        assert!(matches!(err, ClientError::Credential { .. }));
    }

    #[derive(Debug)]
    struct Reject;

    impl CallLayer for Reject {
        fn apply(&self, _request: Request<()>) -> Result<Request<()>, Status> {
            Err(Status::permission_denied("rejected by test layer"))
        }
    }

    #[derive(Debug)]
    struct Tag(&'static str);

    impl CallLayer for Tag {
        fn apply(&self, mut request: Request<()>) -> Result<Request<()>, Status> {
            request
                .metadata_mut()
                .insert("x-last-layer", self.0.parse().unwrap());
            Ok(request)
        }
    }

    #[test]
    fn layers_run_in_insertion_order() {
        let mut chain = CallChain::new().with_layer(Tag("first")).with_layer(Tag("second"));

        let request = chain.call(Request::new(())).unwrap();
        assert_eq!(
            request.metadata().get("x-last-layer").unwrap().to_str().unwrap(),
            "second"
        );
    }

    #[test]
    fn failing_layer_stops_the_chain() {
        let mut chain = CallChain::for_token("t").unwrap().with_layer(Reject);
        let status = chain.call(Request::new(())).unwrap_err();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);
    }
}
