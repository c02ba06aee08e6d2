use std::collections::VecDeque;

use foundation::bounds::Viewport;
use protocol::{decode, Message, Operation, Payload, WorkerEvent};

use crate::worker::{WorkerError, WorkerPort};

/// In-memory port that records posts and replays queued replies.
#[derive(Debug, Default)]
pub(crate) struct RecordingPort {
    pub sent: Vec<Message>,
    pub replies: VecDeque<WorkerEvent>,
    pub restarts: u32,
    pub disconnected: bool,
}

impl RecordingPort {
    pub fn viewports_sent(&self) -> Vec<Viewport> {
        self.sent
            .iter()
            .filter(|m| m.operation == Operation::SetViewport)
            .map(|m| match decode(m) {
                Ok(Payload::Viewport(v)) => v,
                other => panic!("bad viewport message: {other:?}"),
            })
            .collect()
    }

    pub fn ops_sent(&self) -> Vec<Operation> {
        self.sent.iter().map(|m| m.operation).collect()
    }
}

impl WorkerPort for RecordingPort {
    fn post(&mut self, message: Message) -> Result<(), WorkerError> {
        if self.disconnected {
            return Err(WorkerError::Disconnected);
        }
        self.sent.push(message);
        Ok(())
    }

    fn try_recv(&mut self) -> Result<Option<WorkerEvent>, WorkerError> {
        match self.replies.pop_front() {
            Some(event) => Ok(Some(event)),
            None if self.disconnected => Err(WorkerError::Disconnected),
            None => Ok(None),
        }
    }

    fn restart(&mut self) -> Result<(), WorkerError> {
        self.restarts += 1;
        self.disconnected = false;
        self.replies.clear();
        Ok(())
    }
}
