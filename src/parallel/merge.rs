use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use crossbeam::select;
use crossbeam::sync::WaitGroup;
use crossbeam::thread::Scope;

use super::progress::RunCounters;
use super::signal::CancellationSignal;
use super::types::ResultItem;

/// Fan-in merge of several result streams into one unordered stream.
///
/// One forwarding thread is spawned per source. A tracker thread waits for
/// every forwarder to finish and only then drops the last sender, closing
/// the merged stream. No ordering is imposed between sources.
pub fn merge<'env, U>(
    scope: &Scope<'env>,
    sources: Vec<Receiver<ResultItem<U>>>,
    signal: &'env CancellationSignal,
    counters: &'env RunCounters,
) -> Result<Receiver<ResultItem<U>>>
where
    U: Send + 'env,
{
    let (merged_tx, merged_rx) = bounded(0);
    let forwarders = WaitGroup::new();
    let source_count = sources.len();

    for (source_id, source) in sources.into_iter().enumerate() {
        let output = merged_tx.clone();
        let done = forwarders.clone();

        let spawned = scope
            .builder()
            .name(format!("indexflow-forward-{source_id}"))
            .spawn(move |_| {
                forward(source_id, source, output, signal, counters);
                drop(done);
            });

        if let Err(e) = spawned {
            signal.cancel();
            return Err(e).with_context(|| format!("Failed to spawn forwarder {source_id}"));
        }
    }

    scope
        .builder()
        .name("indexflow-merge".to_string())
        .spawn(move |_| {
            forwarders.wait();
            drop(merged_tx);
            tracing::debug!(sources = source_count, "merged stream closed");
        })
        .map_err(|e| {
            signal.cancel();
            e
        })
        .context("Failed to spawn merge tracker")?;

    Ok(merged_rx)
}

/// Copy items from `source` to `output` until the source closes or the signal fires
fn forward<U>(
    source_id: usize,
    source: Receiver<ResultItem<U>>,
    output: Sender<ResultItem<U>>,
    signal: &CancellationSignal,
    counters: &RunCounters,
) -> usize {
    let mut forwarded = 0;

    loop {
        if signal.is_cancelled() {
            break;
        }

        let item = select! {
            recv(source) -> msg => match msg {
                Ok(item) => item,
                Err(_) => break,
            },
            recv(signal.done()) -> _ => break,
        };

        select! {
            send(output, item) -> res => {
                if res.is_err() {
                    break; // Consumer went away
                }
            }
            recv(signal.done()) -> _ => break,
        }

        counters.record_forwarded();
        forwarded += 1;
    }

    tracing::trace!(source_id, forwarded, "forwarder finished");
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn item(index: usize) -> ResultItem<usize> {
        ResultItem { index, value: index * 10 }
    }

    #[test]
    fn test_merges_union_of_all_sources() {
        let signal = CancellationSignal::new();
        let counters = RunCounters::new(0);

        let merged = crossbeam::thread::scope(|s| {
            let mut sources = Vec::new();
            for source_id in 0..4 {
                let (tx, rx) = bounded(0);
                sources.push(rx);
                s.spawn(move |_| {
                    for offset in 0..25 {
                        tx.send(item(source_id * 25 + offset)).unwrap();
                    }
                });
            }

            let merged_rx = merge(s, sources, &signal, &counters).unwrap();
            merged_rx.iter().collect::<Vec<_>>()
        })
        .unwrap();

        assert_eq!(merged.len(), 100);
        let indices: BTreeSet<_> = merged.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..100).collect());
        assert_eq!(counters.forwarded(), 100);
    }

    #[test]
    fn test_no_sources_closes_immediately() {
        let signal = CancellationSignal::new();
        let counters = RunCounters::new(0);

        let received = crossbeam::thread::scope(|s| {
            let merged_rx = merge::<usize>(s, Vec::new(), &signal, &counters).unwrap();
            merged_rx.iter().count()
        })
        .unwrap();

        assert_eq!(received, 0);
    }

    #[test]
    fn test_cancel_closes_merged_stream_with_sources_still_open() {
        let signal = CancellationSignal::new();
        let counters = RunCounters::new(0);

        crossbeam::thread::scope(|s| {
            // Sources that never send and never close on their own
            let (held_tx, held_rx) = bounded::<ResultItem<usize>>(0);
            let merged_rx = merge(s, vec![held_rx.clone(), held_rx], &signal, &counters).unwrap();

            signal.cancel();
            assert!(merged_rx.recv().is_err());
            drop(held_tx);
        })
        .unwrap();
    }
}
