//! Crash recovery (§4.8, §8): replays an interrupted write-ahead flag
//! before a store starts serving traffic, the same role the teacher's
//! `concurrency::recovery::RecoveryCoordinator` plays driving a replayer
//! against storage at startup — here the replayer is the engine's own
//! `commit_steps_3_to_8`/`commit_remove` rather than a WAL segment walk.

use serde::de::DeserializeOwned;
use serde::Serialize;
use willow_core::{AuthorisationScheme, Digest, LiftingMonoid, NamespaceId, Result, SubspaceId};
use willow_durability::WafState;

use crate::engine::StoreEngine;
use crate::events::Event;

/// Runs once, at store construction, before any caller-visible operation.
pub struct Recovery;

impl Recovery {
    /// Read the write-ahead flag and replay whatever it says was
    /// underway, clearing it once replay is idempotently complete.
    pub async fn run<N, S, PD, AD, Auth, M>(engine: &StoreEngine<N, S, PD, AD, Auth, M>) -> Result<()>
    where
        N: NamespaceId,
        S: SubspaceId,
        PD: Digest,
        AD: Digest,
        Auth: AuthorisationScheme<N, S, PD, AD>,
        M: LiftingMonoid<[u8], [u8]> + Clone,
        M::Output: Serialize + DeserializeOwned,
    {
        match engine.waf.read::<N, S, PD, AD>().await? {
            Some(WafState::Insert(entry)) => {
                let result = engine.commit_steps_3_to_8(&entry).await;
                match result {
                    Ok(removed) => {
                        engine.event_sink.publish(Event::EntryIngest { entry, removed });
                    }
                    Err(err) if err.is_admission_noop() => {}
                    Err(err) => return Err(err),
                }
            }
            Some(WafState::Remove(partial)) => {
                engine.commit_remove(&partial).await?;
                engine.waf.clear().await?;
            }
            None => {}
        }
        Ok(())
    }
}
