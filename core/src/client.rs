//! Session facade over the read path and the vote pipeline

use std::sync::Arc;

use shadowvote_ballot::{OptionIndex, VoterIdentity};
use tokio::sync::watch;

use crate::catalog::{OptionCatalog, Tally};
use crate::error::{ConnectionError, ReadFailure, VoteError};
use crate::ledger::{Confirmation, LedgerReader, WalletProvider};
use crate::pipeline::{PipelineStatus, SubmissionPipeline, SubmissionState};
use crate::prover::ProvingBackend;
use crate::session::SessionBinder;

/// One voter session: identity, standings and the vote pipeline
pub struct VotingClient<P, W, R> {
    session: SessionBinder<W>,
    catalog: Arc<OptionCatalog<R>>,
    pipeline: SubmissionPipeline<P, W>,
}

impl<P, W, R> VotingClient<P, W, R>
where
    P: ProvingBackend,
    W: WalletProvider,
    R: LedgerReader,
{
    pub fn new(
        session: SessionBinder<W>,
        catalog: Arc<OptionCatalog<R>>,
        pipeline: SubmissionPipeline<P, W>,
    ) -> Self {
        Self {
            session,
            catalog,
            pipeline,
        }
    }

    /// Connect-on-load; the outcome is cached for the session
    pub async fn connect(&self) -> Result<VoterIdentity, ConnectionError> {
        self.session
            .bind()
            .await
            .inspect_err(|err| self.pipeline.report(&VoteError::Connection(err.clone())))
    }

    /// Current standings, independent of the wallet
    pub async fn tallies(&self) -> Result<Vec<Tally>, ReadFailure> {
        self.catalog.fetch_all().await
    }

    /// Vote for `option`.
    ///
    /// An out-of-range option fails before the wallet is consulted.
    pub async fn vote(&self, option: OptionIndex) -> Result<Confirmation, VoteError> {
        self.pipeline.check_option(option)?;
        let identity = self.connect().await?;
        self.pipeline.submit(&identity, option).await
    }

    pub fn catalog(&self) -> &Arc<OptionCatalog<R>> {
        &self.catalog
    }

    pub fn pipeline(&self) -> &SubmissionPipeline<P, W> {
        &self.pipeline
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.pipeline.subscribe()
    }

    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    pub fn state(&self) -> SubmissionState {
        self.pipeline.state()
    }
}
