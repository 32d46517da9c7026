//! # Mock Repository
//!
//! `MockRepository<T>` hands out a real [`RepositoryClient`] whose requests are answered
//! from a queue of expectations instead of a store. Use it to drive handlers into paths
//! that are awkward to reach with a live backend: conflicts, timeouts, backend faults.
//!
//! ```rust,ignore
//! let mock = MockRepository::<ResourceInstance<Customer>>::new("customer");
//! mock.expect_create().return_err(RepositoryError::Conflict("c1".into()));
//!
//! let repository: Arc<dyn ResourceRepository<_>> = Arc::new(mock.client());
//! // ... exercise the handler ...
//! mock.verify();
//! ```
//!
//! Expectations are consumed in order. A request that does not match the next expectation
//! is answered with [`RepositoryError::Backend`] and counted; [`MockRepository::verify`]
//! panics if any expectation is left over or any request was unexpected.

use super::client::RepositoryClient;
use super::error::RepositoryError;
use super::message::RepositoryRequest;
use super::RepositoryTimeouts;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

enum Expectation<T> {
    Instance {
        id: String,
        response: Result<T, RepositoryError>,
    },
    List {
        response: Result<Vec<T>, RepositoryError>,
    },
    Create {
        response: Result<T, RepositoryError>,
    },
    Update {
        id: String,
        response: Result<T, RepositoryError>,
    },
    Delete {
        id: String,
        response: Result<(), RepositoryError>,
    },
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A repository answering from scripted expectations.
pub struct MockRepository<T> {
    client: RepositoryClient<T>,
    expectations: Queue<T>,
    unexpected: Arc<AtomicUsize>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: Send + 'static> MockRepository<T> {
    /// Creates a mock with no expectations. Must be called inside a tokio runtime.
    pub fn new(resource: &str) -> Self {
        Self::with_timeouts(resource, RepositoryTimeouts::default())
    }

    pub fn with_timeouts(resource: &str, timeouts: RepositoryTimeouts) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RepositoryRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let unexpected = Arc::new(AtomicUsize::new(0));

        let queue = expectations.clone();
        let misses = unexpected.clone();
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();

                match (request, expectation) {
                    (
                        RepositoryRequest::Instance { id, respond_to },
                        Some(Expectation::Instance { id: expected, response }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (
                        RepositoryRequest::List { respond_to, .. },
                        Some(Expectation::List { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        RepositoryRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        RepositoryRequest::Update { id, respond_to, .. },
                        Some(Expectation::Update { id: expected, response }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (
                        RepositoryRequest::Delete { id, respond_to },
                        Some(Expectation::Delete { id: expected, response }),
                    ) if id == expected => {
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        misses.fetch_add(1, Ordering::SeqCst);
                        reject(request);
                    }
                }
            }
        });

        Self {
            client: RepositoryClient::new(resource, sender, timeouts),
            expectations,
            unexpected,
            _handle: handle,
        }
    }

    /// The client to hand to the code under test.
    pub fn client(&self) -> RepositoryClient<T> {
        self.client.clone()
    }

    pub fn expect_instance(&self, id: impl Into<String>) -> ExpectationBuilder<'_, T, T> {
        let id = id.into();
        self.builder(move |response| Expectation::Instance { id, response })
    }

    pub fn expect_list(&self) -> ExpectationBuilder<'_, T, Vec<T>> {
        self.builder(|response| Expectation::List { response })
    }

    pub fn expect_create(&self) -> ExpectationBuilder<'_, T, T> {
        self.builder(|response| Expectation::Create { response })
    }

    pub fn expect_update(&self, id: impl Into<String>) -> ExpectationBuilder<'_, T, T> {
        let id = id.into();
        self.builder(move |response| Expectation::Update { id, response })
    }

    pub fn expect_delete(&self, id: impl Into<String>) -> ExpectationBuilder<'_, T, ()> {
        let id = id.into();
        self.builder(move |response| Expectation::Delete { id, response })
    }

    fn builder<R>(
        &self,
        make: impl FnOnce(Result<R, RepositoryError>) -> Expectation<T> + 'static,
    ) -> ExpectationBuilder<'_, T, R> {
        ExpectationBuilder {
            expectations: &self.expectations,
            make: Box::new(make),
        }
    }

    /// Panics unless every expectation was consumed and no request was unexpected.
    pub fn verify(&self) {
        let remaining = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let unexpected = self.unexpected.load(Ordering::SeqCst);
        if remaining > 0 || unexpected > 0 {
            panic!(
                "Mock repository expectations not met: {remaining} remaining, {unexpected} unexpected requests"
            );
        }
    }
}

fn reject<T>(request: RepositoryRequest<T>) {
    let error = || RepositoryError::Backend("unexpected request".into());
    match request {
        RepositoryRequest::Instance { respond_to, .. } => {
            let _ = respond_to.send(Err(error()));
        }
        RepositoryRequest::List { respond_to, .. } => {
            let _ = respond_to.send(Err(error()));
        }
        RepositoryRequest::Create { respond_to, .. } => {
            let _ = respond_to.send(Err(error()));
        }
        RepositoryRequest::Update { respond_to, .. } => {
            let _ = respond_to.send(Err(error()));
        }
        RepositoryRequest::Delete { respond_to, .. } => {
            let _ = respond_to.send(Err(error()));
        }
    }
}

/// Completes an expectation with its scripted answer.
pub struct ExpectationBuilder<'a, T, R> {
    expectations: &'a Queue<T>,
    make: Box<dyn FnOnce(Result<R, RepositoryError>) -> Expectation<T>>,
}

impl<T, R> ExpectationBuilder<'_, T, R> {
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: RepositoryError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<R, RepositoryError>) {
        let expectation = (self.make)(response);
        self.expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(expectation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ReadOptions, ResourceRepository};

    #[tokio::test]
    async fn answers_in_order_and_verifies() {
        let mock = MockRepository::<String>::new("notes");
        mock.expect_create().return_ok("created".to_string());
        mock.expect_instance("n1")
            .return_err(RepositoryError::NotFound("n1".into()));

        let client = mock.client();
        assert_eq!(client.create("draft".to_string()).await.unwrap(), "created");
        let err = client
            .instance("n1", &ReadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "1 unexpected requests")]
    async fn unexpected_requests_fail_verification() {
        let mock = MockRepository::<String>::new("notes");
        let err = mock.client().delete("n1").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Backend(_)));
        mock.verify();
    }
}
