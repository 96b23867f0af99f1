use faqx_core::{EntryId, Vote};
use serde::Serialize;

/// Handed out with every automatic answer. Only the person who was answered
/// may settle it, and only once.
///
/// The ticket remembers the entry's short as well as its id: ids shift when
/// an earlier entry is deleted, so the engine re-resolves by short when the
/// id no longer points at the same entry.
///
/// Tickets are only minted by the engine and cannot be duplicated:
///
/// ```compile_fail
/// fn duplicate(ticket: &faqx_engine::FeedbackTicket) -> faqx_engine::FeedbackTicket {
///     ticket.clone()
/// }
/// ```
#[derive(Debug, PartialEq, Serialize)]
pub struct FeedbackTicket {
    entry: EntryId,
    short: String,
    addressee: String,
    settled: Option<Vote>,
}

/// Outcome of a vote attempt on a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Recorded(Vote),
    NotAddressee,
    AlreadySettled,
}

impl FeedbackTicket {
    pub(crate) fn new(entry: EntryId, short: &str, addressee: &str) -> Self {
        Self {
            entry,
            short: short.to_string(),
            addressee: addressee.to_string(),
            settled: None,
        }
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn addressee(&self) -> &str {
        &self.addressee
    }

    pub fn settled(&self) -> Option<Vote> {
        self.settled
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    /// Why `voter` may not settle this ticket, if anything
    pub fn refusal(&self, voter: &str) -> Option<Settlement> {
        if voter != self.addressee {
            Some(Settlement::NotAddressee)
        } else if self.settled.is_some() {
            Some(Settlement::AlreadySettled)
        } else {
            None
        }
    }

    pub(crate) fn mark_settled(&mut self, vote: Vote) {
        self.settled = Some(vote);
    }
}
