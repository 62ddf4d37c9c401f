use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SampleBlock;

struct Output {
	channel: usize,
	tx: mpsc::Sender<Arc<SampleBlock>>,
	dropped: u64,
}

/// Hands every sample block to all registered engines.
///
/// Publishing never waits: an engine whose queue is full misses the block, which shows up on its side as
/// a gap in sample indices.  Queues whose engine has gone away are unregistered on the next publish.
#[derive(Default)]
pub struct SampleFanout {
	outputs: Vec<Output>,
}

impl SampleFanout {

	pub fn new() -> Self { Self::default() }

	pub fn register(&mut self, channel:usize, tx:mpsc::Sender<Arc<SampleBlock>>) {
		self.outputs.push(Output{ channel, tx, dropped: 0 });
	}

	pub fn len(&self) -> usize { self.outputs.len() }

	pub fn is_empty(&self) -> bool { self.outputs.is_empty() }

	/// Returns the number of engines the block was queued for
	pub fn publish(&mut self, block:SampleBlock) -> usize {
		let block = Arc::new(block);
		let mut delivered:usize = 0;
		let mut closed:Vec<usize> = vec![];

		for (idx, out) in self.outputs.iter_mut().enumerate() {
			match out.tx.try_send(block.clone()) {
				Ok(()) => delivered += 1,
				Err(TrySendError::Full(_)) => {
					out.dropped += 1;
					debug!("Channel {}: queue full, block at sample {} dropped", out.channel, block.first_idx);
				},
				Err(TrySendError::Closed(_)) => closed.push(idx),
			}
		}

		for idx in closed.into_iter().rev() {
			let out = self.outputs.remove(idx);
			info!("Channel {}: sample queue closed, unregistered after {} dropped blocks", out.channel, out.dropped);
		}

		delivered
	}

	/// Like `publish` but waits for room in every queue.  For replaying recordings, where nothing should be
	/// lost and the reader can simply slow down.
	pub async fn publish_all(&mut self, block:SampleBlock) -> usize {
		let block = Arc::new(block);
		let mut delivered:usize = 0;
		let mut closed:Vec<usize> = vec![];

		for (idx, out) in self.outputs.iter().enumerate() {
			match out.tx.send(block.clone()).await {
				Ok(()) => delivered += 1,
				Err(_) => closed.push(idx),
			}
		}

		for idx in closed.into_iter().rev() {
			let out = self.outputs.remove(idx);
			info!("Channel {}: sample queue closed, unregistered", out.channel);
		}

		delivered
	}

	/// Blocks dropped for `channel` because its queue was full
	pub fn dropped(&self, channel:usize) -> Option<u64> {
		self.outputs.iter().find(|o| o.channel == channel).map(|o| o.dropped)
	}

}
