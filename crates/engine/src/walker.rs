//! Commit Chain Walker
//!
//! Produces the commits of a branch from its head back to genesis by
//! following `previous` links. The walk is a lazy [`Stream`]: each parent is
//! read only when the consumer asks for the next item. Every call starts a
//! fresh traversal.
//!
//! The natural order is head → genesis. Callers that need oldest-first must
//! reverse.

use crate::reader::CommitReader;
use futures::stream::{self, Stream, TryStreamExt};
use ledgervc_core::{Commit, CommitId, CommitRef, VcsError, VcsResult};

enum Cursor {
    Head(Commit),
    Parent {
        link: CommitRef,
        child_t: i64,
        child_address: String,
    },
}

/// Walk the chain starting at `head`.
///
/// Yields `head` first. Fails with `InvalidCommit` if `t` does not strictly
/// decrease from child to parent, which also stops traversal of cyclic
/// pointers.
pub fn walk(reader: &CommitReader, head: Commit) -> impl Stream<Item = VcsResult<Commit>> + '_ {
    stream::try_unfold(Some(Cursor::Head(head)), move |cursor| async move {
        let commit = match cursor {
            None => return Ok(None),
            Some(Cursor::Head(commit)) => commit,
            Some(Cursor::Parent {
                link,
                child_t,
                child_address,
            }) => {
                let parent = reader.read_commit(&link.address).await?;
                if parent.t() >= child_t {
                    return Err(VcsError::invalid_commit(
                        &child_address,
                        format!(
                            "parent {} has t = {}, not below child t = {}",
                            parent.id,
                            parent.t(),
                            child_t
                        ),
                    ));
                }
                parent
            }
        };
        let next = commit.previous.clone().map(|link| Cursor::Parent {
            link,
            child_t: commit.t(),
            child_address: commit.address.clone(),
        });
        Ok(Some((commit, next)))
    })
}

/// Every commit from `head` to genesis, head first
pub async fn collect_chain(reader: &CommitReader, head: Commit) -> VcsResult<Vec<Commit>> {
    walk(reader, head).try_collect().await
}

/// Commits strictly after the ancestor `lca`, oldest first.
///
/// Stops at the first commit whose id equals `lca` or, when `lca_t` is
/// known, whose `t` is at or below it. Fails with `NotFound` if genesis is
/// passed without reaching the ancestor.
pub async fn commits_after(
    reader: &CommitReader,
    head: Commit,
    lca: &CommitId,
    lca_t: Option<i64>,
) -> VcsResult<Vec<Commit>> {
    let mut chain = Box::pin(walk(reader, head));
    let mut after = Vec::new();
    while let Some(commit) = chain.try_next().await? {
        if &commit.id == lca || lca_t.map_or(false, |t| commit.t() <= t) {
            after.reverse();
            return Ok(after);
        }
        after.push(commit);
    }
    Err(VcsError::not_found(format!("ancestor {} in chain", lca)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgervc_storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn commit_doc(n: i64, t: i64, prev: Option<i64>) -> serde_json::Value {
        let mut doc = json!({
            "id": format!("c{}", n),
            "alias": "L",
            "branch": "main",
            "data": {"t": t}
        });
        if let Some(p) = prev {
            doc["previous"] = json!({"id": format!("c{}", p), "address": format!("mem://c{}", p)});
        }
        doc
    }

    fn linear_store(len: i64) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for n in 0..len {
            let prev = if n == 0 { None } else { Some(n - 1) };
            store.insert_raw(format!("mem://c{}", n), commit_doc(n, n, prev));
        }
        store
    }

    #[tokio::test]
    async fn test_walk_is_head_to_genesis() {
        let store = linear_store(4);
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c3").await.unwrap();
        let chain = collect_chain(&reader, head).await.unwrap();
        let ts: Vec<i64> = chain.iter().map(|c| c.t()).collect();
        assert_eq!(ts, vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_walk_is_lazy() {
        let store = linear_store(4);
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c3").await.unwrap();
        let before = store.read_count();
        let mut chain = Box::pin(walk(&reader, head));
        let first = chain.try_next().await.unwrap().unwrap();
        assert_eq!(first.t(), 3);
        assert_eq!(store.read_count(), before, "head needs no read");
        chain.try_next().await.unwrap();
        assert_eq!(store.read_count(), before + 1);
    }

    #[tokio::test]
    async fn test_non_decreasing_t_rejected() {
        let store = linear_store(3);
        // c2 points at c1, but c1 now claims a higher t
        store.insert_raw("mem://c1", commit_doc(1, 5, Some(0)));
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c2").await.unwrap();
        let err = collect_chain(&reader, head).await.unwrap_err();
        assert!(matches!(err, VcsError::InvalidCommit { .. }));
    }

    #[tokio::test]
    async fn test_commits_after_is_oldest_first() {
        let store = linear_store(5);
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c4").await.unwrap();
        let after = commits_after(&reader, head.clone(), &CommitId::new("c1"), None)
            .await
            .unwrap();
        let ts: Vec<i64> = after.iter().map(|c| c.t()).collect();
        assert_eq!(ts, vec![2, 3, 4]);

        let none = commits_after(&reader, head.clone(), &head.id, None).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_commits_after_falls_back_to_t() {
        let store = linear_store(4);
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c3").await.unwrap();
        let after = commits_after(&reader, head, &CommitId::new("other-spelling"), Some(1))
            .await
            .unwrap();
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_commits_after_unknown_ancestor() {
        let store = linear_store(3);
        let reader = CommitReader::new(store.clone(), ".json");
        let head = reader.read_commit("mem://c2").await.unwrap();
        let err = commits_after(&reader, head, &CommitId::new("zzz"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VcsError::NotFound { .. }));
    }
}
