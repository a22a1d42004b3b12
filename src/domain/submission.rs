/// What the carrier made of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { provider_message_id: String, raw_response: String },
    Rejected { reason_code: String },
}
