//! Session binding
//!
//! Resolves the voter identity from the wallet once per session. The first
//! outcome, success or failure, is cached; a declined prompt is not retried
//! behind the user's back.

use std::sync::Arc;

use shadowvote_ballot::VoterIdentity;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::ConnectionError;
use crate::ledger::WalletProvider;

pub struct SessionBinder<W> {
    wallet: Arc<W>,
    identity: OnceCell<Result<VoterIdentity, ConnectionError>>,
}

impl<W: WalletProvider> SessionBinder<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            identity: OnceCell::new(),
        }
    }

    pub fn wallet(&self) -> &Arc<W> {
        &self.wallet
    }

    /// Identity of the first wallet account.
    ///
    /// Concurrent callers share one wallet request.
    pub async fn bind(&self) -> Result<VoterIdentity, ConnectionError> {
        self.identity
            .get_or_init(|| async {
                match self.wallet.request_accounts().await {
                    Ok(accounts) => match accounts.first() {
                        Some(account) => {
                            let identity = VoterIdentity::new(*account);
                            info!(%identity, "wallet connected");
                            Ok(identity)
                        }
                        None => Err(ConnectionError::ConnectionRejected(
                            "wallet exposed no accounts".to_string(),
                        )),
                    },
                    Err(e) => {
                        warn!(error = %e, "wallet connection failed");
                        Err(e)
                    }
                }
            })
            .await
            .clone()
    }

    /// Identity if `bind` already succeeded
    pub fn identity(&self) -> Option<VoterIdentity> {
        self.identity.get().and_then(|result| result.as_ref().ok().copied())
    }
}
