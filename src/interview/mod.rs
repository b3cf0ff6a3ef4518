//! Interview orchestration
//!
//! Runs the per-class discovery routines and tracks each (endpoint, class)
//! pair's progress. A failing class interview stops that class on that
//! endpoint only; values it already cached stay in place.

mod basic;
mod color_switch;

use std::sync::Arc;

use cc_protocol::{
    CommandClassId, InterviewEvent, InterviewKind, InterviewProgress, InterviewState,
};
use cc_protocol::state_machine::TransitionResult;
use dashmap::DashMap;
use futures::future::join_all;
use tracing::{info, warn};

use crate::driver::DriverHandle;
use crate::endpoint::{Endpoint, EndpointAddress};
use crate::error::InterviewError;

/// Outcome of one class interview on one endpoint
#[derive(Debug)]
pub struct InterviewReport {
    pub endpoint: EndpointAddress,
    pub class: CommandClassId,
    pub kind: InterviewKind,
    /// State after the run
    pub state: InterviewState,
    pub error: Option<InterviewError>,
}

impl InterviewReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Orchestrator {
    driver: DriverHandle,
    progress: DashMap<(EndpointAddress, CommandClassId), InterviewProgress>,
}

impl Orchestrator {
    pub fn new(driver: DriverHandle) -> Self {
        Self {
            driver,
            progress: DashMap::new(),
        }
    }

    pub fn state(&self, endpoint: EndpointAddress, class: CommandClassId) -> InterviewState {
        self.progress
            .get(&(endpoint, class))
            .map(|p| p.state())
            .unwrap_or_default()
    }

    /// Interview one class of one endpoint
    pub async fn interview_class(
        &self,
        endpoint: &Arc<Endpoint>,
        class: CommandClassId,
        kind: InterviewKind,
    ) -> Result<InterviewState, InterviewError> {
        let address = endpoint.address();
        if !endpoint.supports_class(class) {
            return Err(InterviewError::ClassNotImplemented {
                endpoint: address,
                class,
            });
        }

        let key = (address, class);
        let started = self
            .progress
            .entry(key)
            .or_default()
            .process_event(InterviewEvent::Started(kind));
        if let TransitionResult::Invalid { .. } = started {
            return Err(InterviewError::AlreadyRunning {
                endpoint: address,
                class,
            });
        }

        info!("{}: doing a {:?} {} interview", address, kind, class);
        let result = match class {
            CommandClassId::ColorSwitch => color_switch::interview(&self.driver, endpoint, kind).await,
            CommandClassId::Basic => basic::interview(&self.driver, endpoint, kind).await,
        };

        let mut progress = self.progress.entry(key).or_default();
        match result {
            Ok(()) => {
                progress.process_event(InterviewEvent::Succeeded(kind));
                let state = progress.state();
                info!("{}: {} interview done, now {:?}", address, class, state);
                Ok(state)
            }
            Err(source) => {
                progress.process_event(InterviewEvent::Failed {
                    kind,
                    reason: source.to_string(),
                });
                warn!("{}: {} interview failed: {}", address, class, source);
                Err(InterviewError::Api {
                    endpoint: address,
                    class,
                    source,
                })
            }
        }
    }

    /// Interview every class of an endpoint, one after another
    pub async fn interview_endpoint(
        &self,
        endpoint: &Arc<Endpoint>,
        kind: InterviewKind,
    ) -> Vec<InterviewReport> {
        let mut reports = Vec::new();
        for class in endpoint.classes() {
            let result = self.interview_class(endpoint, class, kind).await;
            reports.push(InterviewReport {
                endpoint: endpoint.address(),
                class,
                kind,
                state: self.state(endpoint.address(), class),
                error: result.err(),
            });
        }
        reports
    }

    /// Interview several endpoints concurrently
    pub async fn interview_all(
        &self,
        endpoints: &[Arc<Endpoint>],
        kind: InterviewKind,
    ) -> Vec<InterviewReport> {
        join_all(endpoints.iter().map(|e| self.interview_endpoint(e, kind)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}
