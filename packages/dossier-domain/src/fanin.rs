//! Completion is inferred from persisted document counts rather than a join barrier.

use crate::status::JobStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentCounts {
	pub total: u64,
	/// Documents whose status is not terminal.
	pub pending: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanInDecision {
	/// Every document has settled; try the analyzing gate.
	Ready,
	Pending,
	/// No documents exist yet, so the opportunistic check cannot decide.
	Empty,
	/// Synthesis was already dispatched or the job is finished.
	Settled,
}

pub fn evaluate(job_status: JobStatus, counts: DocumentCounts) -> FanInDecision {
	if job_status.is_past_fan_in() {
		return FanInDecision::Settled;
	}
	if counts.total == 0 {
		return FanInDecision::Empty;
	}
	if counts.pending > 0 {
		return FanInDecision::Pending;
	}

	FanInDecision::Ready
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeDecision {
	NoOp,
	/// Go through the same analyzing gate as the opportunistic check.
	Dispatch,
	/// Zero documents and nothing left in flight: finish with an empty timeline.
	CompleteEmpty,
	Reschedule,
}

pub fn decide_finalize(
	job_status: JobStatus,
	counts: DocumentCounts,
	queued_sources: u64,
) -> FinalizeDecision {
	if job_status.is_past_fan_in() {
		return FinalizeDecision::NoOp;
	}
	// Discovery has not committed its sources yet.
	if matches!(job_status, JobStatus::Queued | JobStatus::Discovering) {
		return FinalizeDecision::Reschedule;
	}

	match evaluate(job_status, counts) {
		FanInDecision::Ready => FinalizeDecision::Dispatch,
		FanInDecision::Empty if queued_sources == 0 => FinalizeDecision::CompleteEmpty,
		FanInDecision::Empty | FanInDecision::Pending => FinalizeDecision::Reschedule,
		FanInDecision::Settled => FinalizeDecision::NoOp,
	}
}
