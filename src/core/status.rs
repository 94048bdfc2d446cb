//! Document status machines.
//!
//! Each document kind has a closed set of statuses and a closed set of actions.
//! [`resolve`] turns `(current status, requested action name)` into the target
//! status or an [`Error::InvalidTransition`]; persisting the change and its history
//! entry is the job of the owning record module.

use crate::errors::{Error, Result};
use serde::Serialize;
use std::{fmt::Debug, str::FromStr};

/// Kind of document a history entry or comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A quotation
    Quotation,
    /// A sales order
    SalesOrder,
}

impl DocumentKind {
    /// Value stored in the `document_kind` columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quotation => "quotation",
            Self::SalesOrder => "sales_order",
        }
    }
}

/// A status set with its allowed actions.
pub trait StatusMachine: Copy + Eq + Debug + FromStr<Err = Error> + 'static {
    /// Actions that move a document between statuses.
    type Action: Copy + Eq + Debug + 'static;

    /// Every action of this machine.
    const ACTIONS: &'static [Self::Action];

    /// Status a new document starts in.
    const INITIAL: Self;

    /// Stored/display form of the status.
    fn as_str(self) -> &'static str;

    /// Wire name of an action.
    fn action_name(action: Self::Action) -> &'static str;

    /// Target status of `action` from `self`, or `None` when not allowed.
    fn apply(self, action: Self::Action) -> Option<Self>;

    /// Parses an action from its wire name.
    fn parse_action(name: &str) -> Option<Self::Action> {
        Self::ACTIONS
            .iter()
            .copied()
            .find(|action| Self::action_name(*action) == name)
    }

    /// A terminal status accepts no action at all.
    fn is_terminal(self) -> bool {
        Self::ACTIONS.iter().all(|action| self.apply(*action).is_none())
    }
}

/// Validates `action_name` against the current status.
///
/// Unknown action names and actions not allowed from `from` both fail with
/// [`Error::InvalidTransition`].
pub fn resolve<S: StatusMachine>(from: S, action_name: &str) -> Result<(S::Action, S)> {
    S::parse_action(action_name)
        .and_then(|action| from.apply(action).map(|to| (action, to)))
        .ok_or_else(|| Error::InvalidTransition {
            from: from.as_str().to_string(),
            action: action_name.to_string(),
        })
}

/// Refuses content edits and revisions on terminal documents.
pub fn ensure_editable<S: StatusMachine>(status: S, operation: &str) -> Result<()> {
    if status.is_terminal() {
        return Err(Error::InvalidTransition {
            from: status.as_str().to_string(),
            action: operation.to_string(),
        });
    }
    Ok(())
}

fn parse_status<S: StatusMachine>(value: &str, candidates: &[S]) -> Result<S> {
    candidates
        .iter()
        .copied()
        .find(|status| status.as_str() == value)
        .ok_or_else(|| Error::validation("status", format!("unknown status '{value}'")))
}

/// Quotation statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotationStatus {
    /// Being prepared
    Draft,
    /// Sent to the customer
    Send,
    /// Accepted by the customer
    Approved,
    /// Declined by the customer
    Rejected,
    /// Turned into a sales order
    Converted,
    /// Cancelled or lapsed
    Expired,
}

/// Quotation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotationAction {
    /// Re-save while still a draft
    SaveDraft,
    /// Send to the customer
    Submit,
    /// Record acceptance
    Approve,
    /// Record rejection
    Reject,
    /// Create a sales order from an approved quotation
    ConvertToSo,
    /// Expire the quotation
    Cancel,
}

impl QuotationStatus {
    const ALL: [Self; 6] = [
        Self::Draft,
        Self::Send,
        Self::Approved,
        Self::Rejected,
        Self::Converted,
        Self::Expired,
    ];
}

impl StatusMachine for QuotationStatus {
    type Action = QuotationAction;

    const ACTIONS: &'static [QuotationAction] = &[
        QuotationAction::SaveDraft,
        QuotationAction::Submit,
        QuotationAction::Approve,
        QuotationAction::Reject,
        QuotationAction::ConvertToSo,
        QuotationAction::Cancel,
    ];

    const INITIAL: Self = Self::Draft;

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Send => "Send",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Converted => "Converted (SO)",
            Self::Expired => "Expired",
        }
    }

    fn action_name(action: QuotationAction) -> &'static str {
        match action {
            QuotationAction::SaveDraft => "save_draft",
            QuotationAction::Submit => "submit",
            QuotationAction::Approve => "approve",
            QuotationAction::Reject => "reject",
            QuotationAction::ConvertToSo => "convert_to_so",
            QuotationAction::Cancel => "cancel",
        }
    }

    fn apply(self, action: QuotationAction) -> Option<Self> {
        use QuotationAction as A;
        match (self, action) {
            (Self::Draft, A::SaveDraft) => Some(Self::Draft),
            (Self::Draft, A::Submit) => Some(Self::Send),
            (Self::Send, A::Approve) => Some(Self::Approved),
            (Self::Send, A::Reject) => Some(Self::Rejected),
            (Self::Approved, A::ConvertToSo) => Some(Self::Converted),
            (Self::Draft | Self::Send | Self::Approved | Self::Rejected, A::Cancel) => {
                Some(Self::Expired)
            }
            _ => None,
        }
    }
}

impl FromStr for QuotationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s, &Self::ALL)
    }
}

/// Sales order statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalesOrderStatus {
    /// Being prepared
    Draft,
    /// Submitted for fulfilment
    Submitted,
    /// Submitted with payment due
    SubmittedPd,
    /// Cancelled
    Cancelled,
}

/// Sales order actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalesOrderAction {
    /// Re-save while still a draft
    SaveDraft,
    /// Submit the order
    Submit,
    /// Submit the order with payment due
    SubmitPd,
    /// Cancel a submitted order
    Cancel,
}

impl SalesOrderStatus {
    const ALL: [Self; 4] = [
        Self::Draft,
        Self::Submitted,
        Self::SubmittedPd,
        Self::Cancelled,
    ];
}

impl StatusMachine for SalesOrderStatus {
    type Action = SalesOrderAction;

    const ACTIONS: &'static [SalesOrderAction] = &[
        SalesOrderAction::SaveDraft,
        SalesOrderAction::Submit,
        SalesOrderAction::SubmitPd,
        SalesOrderAction::Cancel,
    ];

    const INITIAL: Self = Self::Draft;

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::SubmittedPd => "Submitted(PD)",
            Self::Cancelled => "Cancelled",
        }
    }

    fn action_name(action: SalesOrderAction) -> &'static str {
        match action {
            SalesOrderAction::SaveDraft => "save_draft",
            SalesOrderAction::Submit => "submit",
            SalesOrderAction::SubmitPd => "submit_pd",
            SalesOrderAction::Cancel => "cancel",
        }
    }

    fn apply(self, action: SalesOrderAction) -> Option<Self> {
        use SalesOrderAction as A;
        match (self, action) {
            (Self::Draft, A::SaveDraft) => Some(Self::Draft),
            (Self::Draft, A::Submit) => Some(Self::Submitted),
            (Self::Draft, A::SubmitPd) => Some(Self::SubmittedPd),
            (Self::Submitted | Self::SubmittedPd, A::Cancel) => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl FromStr for SalesOrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s, &Self::ALL)
    }
}
