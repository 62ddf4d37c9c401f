use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{AcqError, SampleBlock};
use crate::gnss::common::acquisition::{AcquisitionConfig, AcquisitionEngine, AcquisitionReport, ResolvedConfig};
use crate::gnss::common::acquisition::telemetry::AcquisitionObserver;
use crate::gnss::signal::{Modulation, SatelliteId};

pub mod fanout;

pub use self::fanout::SampleFanout;


/// Creates the channel engines push their results into.  Sends never block the engine.
pub fn result_channel() -> (ResultSender, ResultReceiver) {
	let (tx, rx) = mpsc::unbounded_channel::<AcquisitionReport>();
	(ResultSender{ tx }, ResultReceiver{ rx })
}

#[derive(Debug, Clone)]
pub struct ResultSender {
	tx: mpsc::UnboundedSender<AcquisitionReport>,
}

impl ResultSender {

	pub fn send(&self, report:AcquisitionReport) {
		if self.tx.send(report).is_err() {
			debug!("Channel {}: result receiver is gone, report dropped", report.channel);
		}
	}

}

#[derive(Debug)]
pub struct ResultReceiver {
	rx: mpsc::UnboundedReceiver<AcquisitionReport>,
}

impl ResultReceiver {

	/// Waits for the next report; `None` once every sender is dropped
	pub async fn recv(&mut self) -> Option<AcquisitionReport> { self.rx.recv().await }

	pub fn try_recv(&mut self) -> Option<AcquisitionReport> { self.rx.try_recv().ok() }

}

/// Requests from the owning channel, handled between sample blocks
#[derive(Debug)]
pub enum ChannelCommand {
	Assign{ sv:SatelliteId, modulation:Modulation, config:AcquisitionConfig, reply:oneshot::Sender<Result<ResolvedConfig, AcqError>> },
	Start(oneshot::Sender<Result<(), AcqError>>),
	Reset,
}

fn apply_command<O: AcquisitionObserver>(engine:&mut AcquisitionEngine<O>, cmd:ChannelCommand) {
	match cmd {
		ChannelCommand::Assign{ sv, modulation, config, reply } => {
			let _ = reply.send(engine.assign(sv, modulation, config).map(|r| r.clone()));
		},
		ChannelCommand::Start(reply) => { let _ = reply.send(engine.start()); },
		ChannelCommand::Reset => engine.reset(),
	}
}

/// An engine running on its own task
pub struct EngineHandle<O: AcquisitionObserver> {
	pub channel: usize,
	control: mpsc::UnboundedSender<ChannelCommand>,
	input: mpsc::Sender<Arc<SampleBlock>>,
	handle: JoinHandle<AcquisitionEngine<O>>,
}

/// Moves `engine` onto a task fed through a queue of `queue_depth` blocks.  Commands take priority over
/// queued samples.  The task ends once every input sender is dropped and hands the engine back.
pub fn spawn_engine<O>(engine:AcquisitionEngine<O>, queue_depth:usize) -> EngineHandle<O>
	where O: 'static + AcquisitionObserver + Send {

	let channel = engine.channel;
	let (control, mut rx_control) = mpsc::unbounded_channel::<ChannelCommand>();
	let (input, mut rx_input) = mpsc::channel::<Arc<SampleBlock>>(queue_depth.max(1));

	let handle:JoinHandle<AcquisitionEngine<O>> = tokio::spawn(async move {

		let mut owned_engine = engine;
		let mut control_open = true;

		loop {
			tokio::select! {
				biased;
				cmd = rx_control.recv(), if control_open => match cmd {
					Some(cmd) => apply_command(&mut owned_engine, cmd),
					None => control_open = false,
				},
				block = rx_input.recv() => match block {
					Some(block) => { owned_engine.provide_block(&block); },
					None => break,
				},
			}
		}

		debug!("Channel {}: engine task finished", owned_engine.channel);
		owned_engine
	});

	EngineHandle{ channel, control, input, handle }
}

impl<O: AcquisitionObserver> EngineHandle<O> {

	/// Sender to register with a `SampleFanout`
	pub fn input(&self) -> mpsc::Sender<Arc<SampleBlock>> { self.input.clone() }

	pub async fn assign(&self, sv:SatelliteId, modulation:Modulation, config:AcquisitionConfig) -> Result<ResolvedConfig, AcqError> {
		let (reply, rx) = oneshot::channel();
		self.control.send(ChannelCommand::Assign{ sv, modulation, config, reply }).map_err(|_| AcqError::EngineStopped)?;
		rx.await.map_err(|_| AcqError::EngineStopped)?
	}

	pub async fn start(&self) -> Result<(), AcqError> {
		let (reply, rx) = oneshot::channel();
		self.control.send(ChannelCommand::Start(reply)).map_err(|_| AcqError::EngineStopped)?;
		rx.await.map_err(|_| AcqError::EngineStopped)?
	}

	pub fn reset(&self) -> Result<(), AcqError> {
		self.control.send(ChannelCommand::Reset).map_err(|_| AcqError::EngineStopped)
	}

	/// Closes this handle's senders and waits for the task.  Senders registered elsewhere must be dropped
	/// too before this returns.
	pub async fn shutdown(self) -> Result<AcquisitionEngine<O>, AcqError> {
		let EngineHandle{ channel:_, control, input, handle } = self;

		drop(control);
		drop(input);

		handle.await.map_err(|_| AcqError::EngineStopped)
	}

}
