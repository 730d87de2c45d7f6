//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a member. Only `Active` members may post sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
}

impl MemberStatus {
    /// Name used in the persisted file format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "ACTIVE",
            MemberStatus::Inactive => "INACTIVE",
            MemberStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(MemberStatus::Active),
            "INACTIVE" => Ok(MemberStatus::Inactive),
            "TERMINATED" => Ok(MemberStatus::Terminated),
            other => Err(format!("unknown member status: {other}")),
        }
    }
}

/// Shape constraint of a hierarchy.
///
/// - `Unbounded`: any number of children; extra roots may appear after a load.
/// - `Binary`: at most two children per member and exactly one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Unbounded,
    Binary,
}

impl Topology {
    /// Maximum number of direct children per member, `None` when unlimited.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Topology::Unbounded => None,
            Topology::Binary => Some(2),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Unbounded => f.write_str("unbounded"),
            Topology::Binary => f.write_str("binary"),
        }
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unbounded" => Ok(Topology::Unbounded),
            "binary" | "bounded" => Ok(Topology::Binary),
            other => Err(format!("unknown topology: {other} (expected unbounded|binary)")),
        }
    }
}

/// One node of the sponsor tree.
///
/// Structural links are arena handles owned by [`crate::domain::Hierarchy`];
/// they can only change through its mutation methods. Business fields are
/// updated in place through the setters below.
#[derive(Debug, Clone)]
pub struct Member {
    id: String,
    name: String,
    pub(crate) sponsor: Option<Index>,
    pub(crate) children: Vec<Index>,
    pub(crate) previous_sibling: Option<Index>,
    pub(crate) next_sibling: Option<Index>,
    balance: f64,
    own_sales: f64,
    commission_rate: f64,
    status: MemberStatus,
    phone: String,
}

impl Member {
    pub(crate) fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            sponsor: None,
            children: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            balance: 0.0,
            own_sales: 0.0,
            commission_rate: 0.0,
            status: MemberStatus::Active,
            phone: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the sponsor, `None` for a top-level member.
    pub fn sponsor(&self) -> Option<Index> {
        self.sponsor
    }

    /// Handles of the direct children, in attachment order.
    pub fn children(&self) -> &[Index] {
        &self.children
    }

    pub fn previous_sibling(&self) -> Option<Index> {
        self.previous_sibling
    }

    pub fn next_sibling(&self) -> Option<Index> {
        self.next_sibling
    }

    pub fn is_top_level(&self) -> bool {
        self.sponsor.is_none()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn own_sales(&self) -> f64 {
        self.own_sales
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn status(&self) -> MemberStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Add earned commission to the balance.
    pub fn credit(&mut self, amount: f64) {
        self.balance += amount;
    }

    /// Add directly attributed sale volume.
    pub fn add_own_sales(&mut self, amount: f64) {
        self.own_sales += amount;
    }

    /// Set the retained fraction of own sales, clamped to `[0, 1]`.
    pub fn set_commission_rate(&mut self, rate: f64) {
        self.commission_rate = rate.clamp(0.0, 1.0);
    }

    pub fn set_status(&mut self, status: MemberStatus) {
        self.status = status;
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - balance: {:.2}", self.name, self.id, self.balance)
    }
}
