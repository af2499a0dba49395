//! Branch reset
//!
//! Safe mode resolves the requested prior state and rejects a reset to the
//! current state with `NoOp`. Computing the delta between two arbitrary
//! states is not implemented, so any other safe reset reports
//! `NotImplemented`. Hard mode (history rewriting) is not implemented.

use crate::vcs::VersionControl;
use crate::walker::walk;
use futures::TryStreamExt;
use ledgervc_core::{Commit, VcsError, VcsResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State to reset a branch to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSpec {
    /// The latest commit at or below this `t`
    T(i64),
    /// The commit whose hash starts with this prefix
    Sha(String),
}

/// Reset mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Record a new commit reverting to the prior state
    #[default]
    Safe,
    /// Move the pointer back, discarding later commits
    Hard,
}

impl VersionControl {
    /// Reset `branch` to a prior state.
    ///
    /// # Errors
    ///
    /// - `NotImplemented` for [`ResetMode::Hard`], and for any safe reset
    ///   that would change state
    /// - `InvalidStateSpec` if `state` resolves to no commit in the chain
    /// - `NoOp` if `state` is the current head
    pub async fn reset_branch(
        &self,
        branch: &str,
        state: &StateSpec,
        mode: ResetMode,
    ) -> VcsResult<()> {
        let spec = self.parse_spec(branch)?;
        if mode == ResetMode::Hard {
            return Err(VcsError::not_implemented("hard reset"));
        }

        let ledger = self.load_ledger(&spec).await?;
        let head = ledger.head();
        let resolved = self.resolve_state(head.clone(), state).await?;

        if resolved.id == head.id {
            return Err(VcsError::NoOp {
                reason: format!("'{}' is already at {}", spec, head.id),
            });
        }

        debug!(
            target: "ledgervc::rebase",
            branch = %spec,
            head_t = head.t(),
            reset_t = resolved.t(),
            "Safe reset requested"
        );
        Err(VcsError::not_implemented("safe reset delta computation"))
    }

    async fn resolve_state(&self, head: Commit, state: &StateSpec) -> VcsResult<Commit> {
        match state {
            StateSpec::T(t) if *t < 0 || *t > head.t() => Err(VcsError::invalid_state_spec(
                format!("t = {} is outside 0..={}", t, head.t()),
            )),
            StateSpec::T(t) => {
                let mut chain = Box::pin(walk(self.reader(), head));
                while let Some(commit) = chain.try_next().await? {
                    if commit.t() <= *t {
                        return Ok(commit);
                    }
                }
                Err(VcsError::invalid_state_spec(format!("no commit at t = {}", t)))
            }
            StateSpec::Sha(prefix) if prefix.is_empty() => {
                Err(VcsError::invalid_state_spec("empty sha prefix"))
            }
            StateSpec::Sha(prefix) => {
                let mut chain = Box::pin(walk(self.reader(), head));
                while let Some(commit) = chain.try_next().await? {
                    if commit.id.matches_sha_prefix(prefix) {
                        return Ok(commit);
                    }
                }
                Err(VcsError::invalid_state_spec(format!(
                    "no commit matching sha '{}'",
                    prefix
                )))
            }
        }
    }
}
