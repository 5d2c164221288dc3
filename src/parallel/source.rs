use crossbeam::channel::Sender;
use crossbeam::select;

use super::progress::RunCounters;
use super::signal::CancellationSignal;
use super::types::WorkItem;

/// Emit `items` as contiguous, strictly increasing [`WorkItem`]s starting at `first_index`.
///
/// The output channel is closed (by dropping `output`) when the input is
/// exhausted or the signal fires. Returns the number of items handed off.
pub fn emit<I, T>(
    items: I,
    first_index: usize,
    output: Sender<WorkItem<T>>,
    signal: &CancellationSignal,
    counters: &RunCounters,
) -> usize
where
    I: IntoIterator<Item = T>,
{
    let mut emitted = 0;

    for (offset, value) in items.into_iter().enumerate() {
        if signal.is_cancelled() {
            break;
        }

        let item = WorkItem::new(first_index + offset, value);
        let index = item.index;

        select! {
            send(output, item) -> res => {
                if res.is_err() {
                    // Every worker is gone
                    break;
                }
            }
            recv(signal.done()) -> _ => break,
        }

        tracing::trace!(index, "emitted work item");
        counters.record_emitted();
        emitted += 1;
    }

    if signal.is_cancelled() {
        tracing::debug!(emitted, "source stopped early");
    } else {
        tracing::debug!(emitted, "source exhausted");
    }

    emitted
}
