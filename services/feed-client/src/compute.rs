//! Compute domain
//!
//! Owns the P&L engine. Processes commands strictly in arrival order and
//! shares nothing with the other domains.

use pnl_core::{PnlEngine, PnlOutput};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::control::{CalculationResult, ComputeCommand, ComputeEvent};

/// Channel ends for talking to a running compute task.
pub struct ComputeHandle {
    pub commands: mpsc::UnboundedSender<ComputeCommand>,
    pub events: mpsc::UnboundedReceiver<ComputeEvent>,
    pub task: JoinHandle<PnlEngine>,
}

/// Start the compute task. It stops, returning the engine, once every
/// command sender is dropped.
pub fn spawn_compute(engine: PnlEngine) -> ComputeHandle {
    let (commands, receiver) = mpsc::unbounded_channel();
    let (events, event_receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(engine, receiver, events));
    ComputeHandle {
        commands,
        events: event_receiver,
        task,
    }
}

async fn run(
    mut engine: PnlEngine,
    mut commands: mpsc::UnboundedReceiver<ComputeCommand>,
    events: mpsc::UnboundedSender<ComputeEvent>,
) -> PnlEngine {
    while let Some(command) = commands.recv().await {
        if let Some(event) = apply(&mut engine, command) {
            // Nobody listening is not an error for the engine
            let _ = events.send(event);
        }
    }
    debug!(batches = engine.batches_processed(), "Compute task stopped");
    engine
}

/// Apply one command to the engine.
pub fn apply(engine: &mut PnlEngine, command: ComputeCommand) -> Option<ComputeEvent> {
    match command {
        ComputeCommand::SetHeader(directory) => {
            engine.set_directory(directory);
            None
        }
        ComputeCommand::SetPositions(positions) => {
            engine.set_positions(positions);
            None
        }
        ComputeCommand::Reset { ack } => {
            engine.reset();
            let _ = ack.send(());
            None
        }
        ComputeCommand::Calculate { batch, timestamp } => match engine.calculate(batch) {
            PnlOutput::Ranked(ranked) => Some(ComputeEvent::Calculated(CalculationResult {
                records: ranked.records,
                timestamp,
                aggregates: ranked.aggregates,
                session: engine.session_aggregate(),
            })),
            PnlOutput::Passthrough(batch) => Some(ComputeEvent::Passthrough { batch, timestamp }),
        },
    }
}
