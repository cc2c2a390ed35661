use serde::Serialize;

/// Description phrase that marks a cancellation the customer asked us to make.
pub const AT_YOUR_REQUEST: &str = "at your request";

/// Operational queue responsible for acting on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TargetTeam {
    #[serde(rename = "Pre-Installation")]
    PreInstallation,
    #[serde(rename = "Post-Installation")]
    PostInstallation,
    #[serde(rename = "No action - Inactive")]
    NoActionInactive,
    #[serde(rename = "No action - at our request")]
    NoActionAtOurRequest,
}

impl TargetTeam {
    /// Label written into the `target_team` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreInstallation => "Pre-Installation",
            Self::PostInstallation => "Post-Installation",
            Self::NoActionInactive => "No action - Inactive",
            Self::NoActionAtOurRequest => "No action - at our request",
        }
    }

    /// Output stream this team's rows are routed to.
    pub fn destination(&self) -> Destination {
        match self {
            Self::PreInstallation => Destination::PreTeam,
            Self::PostInstallation => Destination::PostTeam,
            Self::NoActionInactive | Self::NoActionAtOurRequest => Destination::Check,
        }
    }
}

impl std::fmt::Display for TargetTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three export files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    PreTeam,
    PostTeam,
    Check,
}

impl Destination {
    pub const ALL: [Destination; 3] = [Self::PreTeam, Self::PostTeam, Self::Check];
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreTeam => write!(f, "pre_team"),
            Self::PostTeam => write!(f, "post_team"),
            Self::Check => write!(f, "check"),
        }
    }
}

/// Team for a CRM pipeline stage. Unknown and empty stages go to pre-installation.
pub fn team_for_stage(stage: &str) -> TargetTeam {
    match stage {
        "N/A" | "SOLD" | "INSTALL" => TargetTeam::PreInstallation,
        "PROVISIONING" | "INVOICING" | "ACTIVE" => TargetTeam::PostInstallation,
        "INACTIVE" => TargetTeam::NoActionInactive,
        _ => TargetTeam::PreInstallation,
    }
}

/// Route an event by resolved stage, then apply the "at your request" override.
///
/// Both comparisons are exact and case-sensitive.
pub fn classify(stage: &str, description: &str) -> TargetTeam {
    let team = team_for_stage(stage);
    if description.contains(AT_YOUR_REQUEST) {
        return TargetTeam::NoActionAtOurRequest;
    }
    team
}
