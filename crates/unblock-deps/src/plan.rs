//! Update planning: classification results into ordered, risk-annotated phases

use crate::types::{AnalysisResult, Category, ClassifiedDependency};
use crate::version::{update_type, UpdateType};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Estimated time to install and verify one package
pub const SECONDS_PER_PACKAGE: u64 = 30;

/// Filters applied when building a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Only include the `safe` phase
    pub safe_only: bool,
    /// Include packages declared in `devDependencies`
    pub include_dev: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            safe_only: false,
            include_dev: true,
        }
    }
}

/// One package to update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdate {
    /// Package name
    pub name: String,
    /// Installed version
    pub current_version: String,
    /// Version to install
    pub target_version: String,
    /// Size of the jump
    pub update_type: UpdateType,
    /// Classification bucket
    #[serde(flatten)]
    pub category: Category,
    /// Declared in `devDependencies`
    pub is_dev: bool,
}

impl PackageUpdate {
    fn from_classified(classified: &ClassifiedDependency) -> Self {
        let update_type = update_type(&classified.record.resolved_version, &classified.latest)
            .unwrap_or(UpdateType::None);
        Self {
            name: classified.record.name.clone(),
            current_version: classified.record.resolved_version.clone(),
            target_version: classified.latest.clone(),
            update_type,
            category: classified.category.clone(),
            is_dev: classified.record.is_dev,
        }
    }

    /// Whether this update is blocked by an installed package
    pub fn is_blocked(&self) -> bool {
        matches!(self.category, Category::Blocked { .. })
    }

    /// `name@version` as passed to the package manager
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.target_version)
    }

    fn blocker_count(&self) -> usize {
        match self.category {
            Category::Blocked { blocker_count, .. } => blocker_count,
            _ => 0,
        }
    }
}

/// Phase names, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Within-major upgrades
    Safe,
    /// Major upgrades
    Major,
    /// Upgrades rejected by an installed package
    Blocked,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Safe => "safe",
            Self::Major => "major",
            Self::Blocked => "blocked",
        })
    }
}

/// A group of updates applied together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhase {
    /// Phase name
    pub kind: PhaseKind,
    /// Updates in application order
    pub packages: Vec<PackageUpdate>,
}

/// An ordered, annotated update plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlan {
    /// Non-empty phases: safe, then major, then blocked
    pub phases: Vec<UpdatePhase>,
    /// Human-readable risk notes
    pub risks: Vec<String>,
    /// Rough duration at [`SECONDS_PER_PACKAGE`] each
    #[serde(serialize_with = "as_secs", rename = "estimatedSeconds")]
    pub estimated_duration: Duration,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

impl UpdatePlan {
    /// Every update, flattened in application order
    pub fn updates(&self) -> impl Iterator<Item = &PackageUpdate> {
        self.phases.iter().flat_map(|phase| phase.packages.iter())
    }

    /// Number of updates
    pub fn len(&self) -> usize {
        self.phases.iter().map(|p| p.packages.len()).sum()
    }

    /// Whether nothing would change
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restrict the plan to `names`; an empty selection keeps everything.
    pub fn select(&self, names: &[String]) -> Self {
        if names.is_empty() {
            return self.clone();
        }
        let updates = self
            .updates()
            .filter(|update| names.iter().any(|n| n == &update.name))
            .cloned()
            .collect();
        build(updates)
    }
}

/// Build an update plan from an analysis, with no side effects.
pub fn preview_update(analysis: &AnalysisResult, options: &PlanOptions) -> UpdatePlan {
    let updates = analysis
        .classified()
        .filter(|c| options.include_dev || !c.record.is_dev)
        .filter(|c| !options.safe_only || c.category == Category::Safe)
        .map(PackageUpdate::from_classified)
        .collect();
    build(updates)
}

fn build(updates: Vec<PackageUpdate>) -> UpdatePlan {
    let mut safe = Vec::new();
    let mut major = Vec::new();
    let mut blocked = Vec::new();
    for update in updates {
        match update.category {
            Category::Safe => safe.push(update),
            Category::MajorJump => major.push(update),
            Category::Blocked { .. } => blocked.push(update),
        }
    }

    safe.sort_by(|a, b| a.name.cmp(&b.name));
    major.sort_by(|a, b| a.name.cmp(&b.name));
    blocked.sort_by(|a, b| {
        a.blocker_count()
            .cmp(&b.blocker_count())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut risks = Vec::new();
    if !major.is_empty() {
        risks.push(format!(
            "{} major version update{} may include breaking changes",
            major.len(),
            plural(major.len())
        ));
    }
    if !blocked.is_empty() {
        risks.push(format!(
            "{} package{} blocked by installed dependencies",
            blocked.len(),
            plural(blocked.len())
        ));
    }

    let total = safe.len() + major.len() + blocked.len();
    let phases = [
        (PhaseKind::Safe, safe),
        (PhaseKind::Major, major),
        (PhaseKind::Blocked, blocked),
    ]
    .into_iter()
    .filter(|(_, packages)| !packages.is_empty())
    .map(|(kind, packages)| UpdatePhase { kind, packages })
    .collect();

    UpdatePlan {
        phases,
        risks,
        estimated_duration: Duration::from_secs(SECONDS_PER_PACKAGE * total as u64),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackageRecord;
    use unblock_registry::LatestVersion;

    fn classified(
        name: &str,
        current: &str,
        latest: &str,
        category: Category,
    ) -> ClassifiedDependency {
        let mut record = PackageRecord::new(name, current);
        record.requested_range = Some(format!("^{current}"));
        record.latest_version = LatestVersion::Known(latest.to_string());
        ClassifiedDependency {
            record,
            latest: latest.to_string(),
            category,
        }
    }

    fn blocked(count: usize) -> Category {
        Category::Blocked {
            blocker_name: "kit".into(),
            blocker_range: "^1.0.0".into(),
            blocker_count: count,
        }
    }

    fn analysis() -> AnalysisResult {
        let mut vitest = classified("vitest", "1.0.0", "1.6.0", Category::Safe);
        vitest.record.is_dev = true;
        AnalysisResult {
            safe: vec![
                classified("zod", "3.22.0", "3.22.4", Category::Safe),
                vitest,
            ],
            major_jump: vec![classified("lodash", "4.1.0", "5.0.0", Category::MajorJump)],
            blocked: vec![
                classified("react", "18.2.0", "19.0.0", blocked(3)),
                classified("eslint", "8.57.0", "9.0.0", blocked(1)),
                classified("axios", "1.6.0", "1.7.0", blocked(3)),
            ],
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn test_phase_order_and_blocked_sorting() {
        let plan = preview_update(&analysis(), &PlanOptions::default());

        let kinds: Vec<PhaseKind> = plan.phases.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, [PhaseKind::Safe, PhaseKind::Major, PhaseKind::Blocked]);

        let order: Vec<&str> = plan.updates().map(|u| u.name.as_str()).collect();
        assert_eq!(order, ["vitest", "zod", "lodash", "eslint", "axios", "react"]);

        assert_eq!(plan.estimated_duration, Duration::from_secs(6 * 30));
        assert_eq!(
            plan.risks,
            [
                "1 major version update may include breaking changes",
                "3 packages blocked by installed dependencies"
            ]
        );
    }

    #[test]
    fn test_update_types() {
        let plan = preview_update(&analysis(), &PlanOptions::default());
        let get = |name: &str| plan.updates().find(|u| u.name == name).unwrap().clone();

        assert_eq!(get("zod").update_type, UpdateType::Patch);
        assert_eq!(get("vitest").update_type, UpdateType::Minor);
        assert_eq!(get("lodash").update_type, UpdateType::Major);
        assert_eq!(get("lodash").spec(), "lodash@5.0.0");
        assert!(get("react").is_blocked());
    }

    #[test]
    fn test_filters() {
        let plan = preview_update(
            &analysis(),
            &PlanOptions {
                safe_only: true,
                include_dev: false,
            },
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.phases[0].packages[0].name, "zod");
        assert!(plan.risks.is_empty());
    }

    #[test]
    fn test_preview_is_pure() {
        let input = analysis();
        let before = input.clone();
        let first = preview_update(&input, &PlanOptions::default());
        let second = preview_update(&input, &PlanOptions::default());
        assert_eq!(input, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_select() {
        let plan = preview_update(&analysis(), &PlanOptions::default());
        let selected = plan.select(&["react".to_string(), "zod".to_string()]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.estimated_duration, Duration::from_secs(60));
        assert_eq!(plan.select(&[]).len(), 6);
        assert!(preview_update(&AnalysisResult::default(), &PlanOptions::default()).is_empty());
    }
}
