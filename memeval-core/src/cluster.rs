// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Memory-test cluster taxonomy
//!
//! Every test record is classified into zero or more of nine fixed clusters,
//! each describing one kind of long-term memory recall.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the nine fixed memory-test clusters.
///
/// Variant order is taxonomy order; stores keyed by `Cluster` iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cluster {
    #[serde(rename = "Personal_Information")]
    PersonalInformation,
    #[serde(rename = "Habits_and_Preferences")]
    HabitsAndPreferences,
    #[serde(rename = "Significant_Events")]
    SignificantEvents,
    #[serde(rename = "Relationships_and_Connections")]
    RelationshipsAndConnections,
    #[serde(rename = "Plans_and_Goals")]
    PlansAndGoals,
    #[serde(rename = "Appointments_and_Time_Specific_Information")]
    AppointmentsAndTimeSpecificInformation,
    #[serde(rename = "Ownership_and_Possessions")]
    OwnershipAndPossessions,
    #[serde(rename = "Locations_and_Places")]
    LocationsAndPlaces,
    #[serde(rename = "Contextual_and_Multi_Session_Memory")]
    ContextualAndMultiSessionMemory,
}

impl Cluster {
    /// All clusters in taxonomy order
    pub const ALL: [Cluster; 9] = [
        Cluster::PersonalInformation,
        Cluster::HabitsAndPreferences,
        Cluster::SignificantEvents,
        Cluster::RelationshipsAndConnections,
        Cluster::PlansAndGoals,
        Cluster::AppointmentsAndTimeSpecificInformation,
        Cluster::OwnershipAndPossessions,
        Cluster::LocationsAndPlaces,
        Cluster::ContextualAndMultiSessionMemory,
    ];

    /// Wire name, as used for JSON keys and in oracle prompts
    pub fn name(&self) -> &'static str {
        match self {
            Cluster::PersonalInformation => "Personal_Information",
            Cluster::HabitsAndPreferences => "Habits_and_Preferences",
            Cluster::SignificantEvents => "Significant_Events",
            Cluster::RelationshipsAndConnections => "Relationships_and_Connections",
            Cluster::PlansAndGoals => "Plans_and_Goals",
            Cluster::AppointmentsAndTimeSpecificInformation => {
                "Appointments_and_Time_Specific_Information"
            }
            Cluster::OwnershipAndPossessions => "Ownership_and_Possessions",
            Cluster::LocationsAndPlaces => "Locations_and_Places",
            Cluster::ContextualAndMultiSessionMemory => "Contextual_and_Multi_Session_Memory",
        }
    }

    /// What recall ability the cluster exercises
    pub fn description(&self) -> &'static str {
        match self {
            Cluster::PersonalInformation => {
                "Storing and recalling basic details about the user over the long term."
            }
            Cluster::HabitsAndPreferences => "Remembering the user's habits and preferences.",
            Cluster::SignificantEvents => {
                "Recalling specific past events the user has mentioned."
            }
            Cluster::RelationshipsAndConnections => {
                "Remembering family, friends or pets the user has talked about."
            }
            Cluster::PlansAndGoals => "Remembering future plans or aspirations of the user.",
            Cluster::AppointmentsAndTimeSpecificInformation => {
                "Accurately recalling times and important dates."
            }
            Cluster::OwnershipAndPossessions => "Remembering items or property the user owns.",
            Cluster::LocationsAndPlaces => "Remembering places that matter to the user.",
            Cluster::ContextualAndMultiSessionMemory => {
                "Connecting and recalling information across sessions or contexts."
            }
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cluster {
    type Err = UnknownCluster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cluster::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCluster(s.to_string()))
    }
}

/// Returned when parsing a cluster name that is not in the taxonomy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cluster: {0}")]
pub struct UnknownCluster(pub String);

/// Cluster flags produced by the classification oracle for one record.
///
/// Non-exclusive: any number of flags may be set, including none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterMembership {
    #[serde(rename = "Personal_Information")]
    pub personal_information: bool,
    #[serde(rename = "Habits_and_Preferences")]
    pub habits_and_preferences: bool,
    #[serde(rename = "Significant_Events")]
    pub significant_events: bool,
    #[serde(rename = "Relationships_and_Connections")]
    pub relationships_and_connections: bool,
    #[serde(rename = "Plans_and_Goals")]
    pub plans_and_goals: bool,
    #[serde(rename = "Appointments_and_Time_Specific_Information")]
    pub appointments_and_time_specific_information: bool,
    #[serde(rename = "Ownership_and_Possessions")]
    pub ownership_and_possessions: bool,
    #[serde(rename = "Locations_and_Places")]
    pub locations_and_places: bool,
    #[serde(rename = "Contextual_and_Multi_Session_Memory")]
    pub contextual_and_multi_session_memory: bool,
}

impl ClusterMembership {
    /// Membership with exactly the given clusters flagged
    pub fn of(clusters: &[Cluster]) -> Self {
        let mut membership = Self::default();
        for cluster in clusters {
            membership.set(*cluster, true);
        }
        membership
    }

    pub fn contains(&self, cluster: Cluster) -> bool {
        match cluster {
            Cluster::PersonalInformation => self.personal_information,
            Cluster::HabitsAndPreferences => self.habits_and_preferences,
            Cluster::SignificantEvents => self.significant_events,
            Cluster::RelationshipsAndConnections => self.relationships_and_connections,
            Cluster::PlansAndGoals => self.plans_and_goals,
            Cluster::AppointmentsAndTimeSpecificInformation => {
                self.appointments_and_time_specific_information
            }
            Cluster::OwnershipAndPossessions => self.ownership_and_possessions,
            Cluster::LocationsAndPlaces => self.locations_and_places,
            Cluster::ContextualAndMultiSessionMemory => self.contextual_and_multi_session_memory,
        }
    }

    pub fn set(&mut self, cluster: Cluster, value: bool) {
        let flag = match cluster {
            Cluster::PersonalInformation => &mut self.personal_information,
            Cluster::HabitsAndPreferences => &mut self.habits_and_preferences,
            Cluster::SignificantEvents => &mut self.significant_events,
            Cluster::RelationshipsAndConnections => &mut self.relationships_and_connections,
            Cluster::PlansAndGoals => &mut self.plans_and_goals,
            Cluster::AppointmentsAndTimeSpecificInformation => {
                &mut self.appointments_and_time_specific_information
            }
            Cluster::OwnershipAndPossessions => &mut self.ownership_and_possessions,
            Cluster::LocationsAndPlaces => &mut self.locations_and_places,
            Cluster::ContextualAndMultiSessionMemory => {
                &mut self.contextual_and_multi_session_memory
            }
        };
        *flag = value;
    }

    /// Flagged clusters, in taxonomy order
    pub fn clusters(&self) -> Vec<Cluster> {
        Cluster::ALL
            .iter()
            .copied()
            .filter(|c| self.contains(*c))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Cluster::ALL.iter().all(|c| !self.contains(*c))
    }
}
