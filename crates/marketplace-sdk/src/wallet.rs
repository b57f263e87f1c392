//! Wallet-signing collaborator interface
//!
//! The SDK never builds or signs transactions itself. It describes the Move
//! call it needs as a [`TransactionPayload`] and hands it to a
//! [`WalletSigner`], which returns the digest and status.

use crate::error::SignerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Argument of a Move call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    String(String),
    U64(u64),
    Bool(bool),
    /// On-chain object by ID
    Object(String),
    /// Coin of this many MIST split from the gas coin
    GasCoin(u64),
}

/// Move call the wallet should build, sign and execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    /// `{package}::{module}::{function}`
    pub target: String,
    pub arguments: Vec<CallArg>,
}

impl TransactionPayload {
    pub fn move_call(package_id: &str, module: &str, function: &str, arguments: Vec<CallArg>) -> Self {
        Self {
            target: format!("{}::{}::{}", package_id, module, function),
            arguments,
        }
    }

    /// `(module, function)` parsed back out of the target.
    pub fn function(&self) -> Option<(&str, &str)> {
        let mut parts = self.target.rsplitn(3, "::");
        let function = parts.next()?;
        let module = parts.next()?;
        parts.next()?;
        Some((module, function))
    }
}

/// Execution status reported by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum TxStatus {
    Success,
    Failure(String),
}

/// Signed and executed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub digest: String,
    pub status: TxStatus,
}

/// Signs and executes transactions on behalf of the connected wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign_and_execute(&self, payload: TransactionPayload) -> Result<TxOutcome, SignerError>;
}

/// Mock signer for testing.
///
/// Records every payload and answers with a sequential digest, or with a
/// configured error/failure status.
pub struct MockSigner {
    calls: Mutex<Vec<TransactionPayload>>,
    error: Option<SignerError>,
    failure: Option<String>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            error: None,
            failure: None,
        }
    }

    /// Refuse every request with `error`.
    pub fn with_error(mut self, error: SignerError) -> Self {
        self.error = Some(error);
        self
    }

    /// Execute but report an on-chain failure.
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Payloads received so far.
    pub fn calls(&self) -> Vec<TransactionPayload> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    async fn sign_and_execute(&self, payload: TransactionPayload) -> Result<TxOutcome, SignerError> {
        let n = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| SignerError::Other("mock signer poisoned".into()))?;
            calls.push(payload);
            calls.len()
        };

        if let Some(ref error) = self.error {
            return Err(error.clone());
        }

        let status = match self.failure {
            Some(ref reason) => TxStatus::Failure(reason.clone()),
            None => TxStatus::Success,
        };

        Ok(TxOutcome {
            digest: format!("mock-digest-{}", n),
            status,
        })
    }
}
