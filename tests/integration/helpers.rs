//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use orgsession::InstanceRuntime;
use orgsession_core::config::AppConfig;
use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::traits::{AccessTokenSource, ParentSession, TokenExchanger};
use orgsession_core::types::{Organization, OrganizationId, TokenResult};
use orgsession_storage::memory::MemorySessionStorage;

/// A parent session whose sign-in state and token tests control.
pub struct TestParent {
    signed_in: AtomicBool,
    token: Mutex<String>,
    organizations: Vec<Organization>,
}

impl TestParent {
    /// A signed-in parent belonging to `org-a` and `org-b`.
    pub fn signed_in() -> Arc<Self> {
        Arc::new(Self {
            signed_in: AtomicBool::new(true),
            token: Mutex::new("parent-token-1".to_string()),
            organizations: vec![
                Organization::new("org-a", "Org A"),
                Organization::new("org-b", "Org B"),
            ],
        })
    }

    /// A parent that has not signed in yet.
    pub fn signed_out() -> Arc<Self> {
        let parent = Self::signed_in();
        parent.signed_in.store(false, Ordering::SeqCst);
        parent
    }

    /// Replace the parent's current access token.
    pub fn rotate_token(&self, token: &str) {
        *self.token.lock().unwrap() = token.to_string();
    }
}

#[async_trait]
impl AccessTokenSource for TestParent {
    async fn access_token(&self) -> AppResult<String> {
        if !self.signed_in.load(Ordering::SeqCst) {
            return Err(AppError::not_signed_in("parent is signed out"));
        }
        Ok(self.token.lock().unwrap().clone())
    }
}

#[async_trait]
impl ParentSession for TestParent {
    async fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    async fn available_organizations(&self) -> Option<Vec<Organization>> {
        Some(self.organizations.clone())
    }
}

/// Exchanger that returns `exchanged-<org>` and counts calls.
#[derive(Default)]
pub struct TestExchanger {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenExchanger for TestExchanger {
    async fn exchange(&self, organization_id: &OrganizationId) -> AppResult<TokenResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenResult::bearer(format!("exchanged-{organization_id}")))
    }
}

/// Runtime on a fresh in-memory storage.
pub fn memory_runtime() -> InstanceRuntime {
    InstanceRuntime::with_storage(AppConfig::default(), Arc::new(MemorySessionStorage::new()))
}

/// Runtime on a shared in-memory storage.
pub fn runtime_on(storage: &MemorySessionStorage) -> InstanceRuntime {
    InstanceRuntime::with_storage(AppConfig::default(), Arc::new(storage.clone()))
}
