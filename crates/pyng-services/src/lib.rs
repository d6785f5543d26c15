//! pyng-services: the transfer pipeline on both ends of the channel.
//!
//! The transmitter turns a file into an ordered chunk stream and hands each
//! chunk to an [`EchoSender`]. On the far side the [`ReceiverStateMachine`]
//! picks transfer chunks out of ordinary ICMP traffic and the
//! [`TransferFinalizer`] turns a completed buffer into a file on disk.

pub mod finalizer;
pub mod receiver;
pub mod transmitter;

pub use finalizer::{split_sections, FinalizeError, ReassembledFile, Sections, TransferFinalizer};
pub use receiver::{CompletedTransfer, Observation, ReceiverState, ReceiverStateMachine, TransferBuffer};
pub use transmitter::{EchoSender, Progress, TransmitError, TransmitSummary, Transmitter};
