//! Organization hierarchy and officer data scoping.
//!
//! Organizations form a tree through `parent_id`. Every question of the form
//! "may this officer see or act on X" is answered from an [`AccessScope`]
//! built here, so handlers never re-derive the filter themselves.
//!
//! Walks over parent links keep a visited set, so a corrupted hierarchy
//! containing a cycle terminates instead of looping.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use super::{Course, HierarchyLevel, Officer, Organization};

/// What an organization (or a set of organizations) reaches.
///
/// A student is covered when their course's program type is in
/// `program_types` or their course belongs to a college in `college_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessScope {
    /// Super officers bypass every filter.
    pub unrestricted: bool,
    pub organization_ids: BTreeSet<i64>,
    pub program_types: BTreeSet<String>,
    pub college_ids: BTreeSet<i64>,
}

impl AccessScope {
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            ..Default::default()
        }
    }

    pub fn includes_organization(&self, organization_id: i64) -> bool {
        self.unrestricted || self.organization_ids.contains(&organization_id)
    }

    pub fn covers_course(&self, course: &Course) -> bool {
        self.unrestricted
            || self.program_types.contains(&normalize_program(&course.program_type))
            || self.college_ids.contains(&course.college_id)
    }

    /// No student can match. Organizations may still be reachable.
    pub fn covers_no_students(&self) -> bool {
        !self.unrestricted && self.program_types.is_empty() && self.college_ids.is_empty()
    }

    fn merge(&mut self, other: AccessScope) {
        self.unrestricted |= other.unrestricted;
        self.organization_ids.extend(other.organization_ids);
        self.program_types.extend(other.program_types);
        self.college_ids.extend(other.college_ids);
    }
}

pub fn normalize_program(program: &str) -> String {
    program.trim().to_uppercase()
}

/// Index over a flat list of organizations.
pub struct OrganizationTree<'a> {
    by_id: HashMap<i64, &'a Organization>,
    children: HashMap<i64, Vec<i64>>,
}

impl<'a> OrganizationTree<'a> {
    pub fn new(organizations: &'a [Organization]) -> Self {
        let mut by_id = HashMap::with_capacity(organizations.len());
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();

        for org in organizations {
            by_id.insert(org.id, org);
            if let Some(parent_id) = org.parent_id {
                children.entry(parent_id).or_default().push(org.id);
            }
        }

        Self { by_id, children }
    }

    pub fn get(&self, id: i64) -> Option<&'a Organization> {
        self.by_id.get(&id).copied()
    }

    /// `id` followed by its parent, grandparent and so on.
    pub fn ancestors_inclusive(&self, id: i64) -> Vec<&'a Organization> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);

        while let Some(org) = current {
            if !seen.insert(org.id) {
                tracing::warn!("Organization hierarchy cycle detected at {}", org.code);
                break;
            }
            chain.push(org);
            current = org.parent_id.and_then(|parent_id| self.get(parent_id));
        }

        chain
    }

    /// `root` and every organization below it.
    pub fn subtree(&self, root: i64) -> BTreeSet<i64> {
        let mut found = BTreeSet::new();
        if self.get(root).is_none() {
            return found;
        }

        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !found.insert(id) {
                continue;
            }
            if let Some(kids) = self.children.get(&id) {
                queue.extend(kids.iter().copied().filter(|kid| !found.contains(kid)));
            }
        }

        found
    }

    /// The first college found walking up from `id`.
    pub fn resolved_college(&self, id: i64) -> Option<i64> {
        self.ancestors_inclusive(id)
            .into_iter()
            .find_map(|org| org.college_id)
    }

    /// Where an umbrella (`ALL`) organization's reach starts: its parent if
    /// it has one, otherwise itself.
    fn scope_root(&self, org: &Organization) -> i64 {
        org.parent_id
            .filter(|parent_id| self.by_id.contains_key(parent_id))
            .unwrap_or(org.id)
    }

    /// The organization itself, plus, for `ALL` affiliation, the whole
    /// subtree under its scope root.
    pub fn accessible_organizations(&self, id: i64) -> BTreeSet<i64> {
        let Some(org) = self.get(id) else {
            return BTreeSet::new();
        };

        let mut accessible = BTreeSet::from([org.id]);
        if org.has_umbrella_scope() {
            accessible.extend(self.subtree(self.scope_root(org)));
        }
        accessible
    }

    /// Students one organization serves, ignoring what its accessible
    /// siblings reach.
    pub fn coverage(&self, id: i64) -> AccessScope {
        let mut scope = AccessScope::default();
        let Some(org) = self.get(id) else {
            return scope;
        };
        scope.organization_ids.insert(org.id);

        if org.has_umbrella_scope() {
            let root = self.scope_root(org);
            if let Some(college_id) = self.resolved_college(root) {
                scope.college_ids.insert(college_id);
            }
            for member in self.subtree(root) {
                if let Some(program) = self.get(member).and_then(Organization::program) {
                    scope.program_types.insert(normalize_program(program));
                }
            }
        } else if let Some(program) = org.program() {
            scope.program_types.insert(normalize_program(program));
        } else if org.hierarchy_level == HierarchyLevel::College {
            if let Some(college_id) = self.resolved_college(org.id) {
                scope.college_ids.insert(college_id);
            }
        }
        // A PROGRAM-level organization without an affiliation covers nobody.

        scope
    }

    /// Union of [`Self::coverage`] over everything the organization can
    /// access.
    pub fn scope_for_organization(&self, id: i64) -> AccessScope {
        let mut scope = AccessScope::default();
        for accessible in self.accessible_organizations(id) {
            scope.merge(self.coverage(accessible));
        }
        scope
    }

    pub fn scope_for_officer(&self, officer: &Officer) -> AccessScope {
        if officer.is_super_officer {
            return AccessScope::unrestricted();
        }
        if !officer.is_active {
            return AccessScope::default();
        }
        self.scope_for_organization(officer.organization_id)
    }

    /// Active organizations whose fees a student of `course` may pay.
    pub fn eligible_organizations(&self, course: &Course) -> Vec<&'a Organization> {
        let mut eligible: Vec<&Organization> = self
            .by_id
            .values()
            .copied()
            .filter(|org| org.is_active && self.coverage(org.id).covers_course(course))
            .collect();
        eligible.sort_by(|a, b| a.name.cmp(&b.name));
        eligible
    }
}

/// Promotion authority over `target_organization_id`.
pub fn can_promote(officer: &Officer, scope: &AccessScope, target_organization_id: i64) -> bool {
    officer.is_active
        && officer.capabilities.can_promote_officers
        && (officer.is_super_officer || scope.includes_organization(target_organization_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OfficerCapabilities;
    use chrono::Utc;

    const ALLORG: i64 = 1;
    const COMSCI: i64 = 2;
    const MARINEBIO: i64 = 3;
    const COMPENDIUM: i64 = 4;
    const CAS_COUNCIL: i64 = 5;
    const ORPHAN: i64 = 6;

    const CAS: i64 = 100;
    const CBM: i64 = 200;

    fn org(
        id: i64,
        code: &str,
        level: HierarchyLevel,
        parent_id: Option<i64>,
        affiliation: Option<&str>,
        college_id: Option<i64>,
    ) -> Organization {
        Organization {
            id,
            name: code.to_string(),
            code: code.to_string(),
            hierarchy_level: level,
            parent_id,
            program_affiliation: affiliation.map(str::to_string),
            college_id,
            fee_tier: "TIER_1".to_string(),
            description: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            booth_location: String::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> Vec<Organization> {
        use HierarchyLevel::*;
        vec![
            org(ALLORG, "ALLORG", College, None, Some("ALL"), None),
            org(COMSCI, "COMSCI", Program, Some(ALLORG), Some("COMPUTER_SCIENCE"), None),
            org(MARINEBIO, "MARINEBIO", Program, Some(ALLORG), Some("MARINE_BIOLOGY"), None),
            org(COMPENDIUM, "COMPENDIUM", College, None, Some("COMPENDIUM"), None),
            org(CAS_COUNCIL, "CASSC", College, None, None, Some(CAS)),
            org(ORPHAN, "ORPHAN", Program, None, None, None),
        ]
    }

    fn course(program_type: &str, college_id: i64) -> Course {
        Course {
            id: 1,
            code: program_type.to_string(),
            name: program_type.to_string(),
            program_type: program_type.to_string(),
            college_id,
        }
    }

    fn officer(organization_id: i64, is_super_officer: bool) -> Officer {
        Officer {
            id: 1,
            user_id: 1,
            employee_id: "EMP-1".to_string(),
            first_name: "Test".to_string(),
            last_name: "Officer".to_string(),
            email: String::new(),
            phone_number: String::new(),
            organization_id,
            role: "Officer".to_string(),
            capabilities: OfficerCapabilities {
                can_promote_officers: true,
                ..OfficerCapabilities::none()
            },
            is_super_officer,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_program_org_accesses_only_itself() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        assert_eq!(tree.accessible_organizations(COMSCI), BTreeSet::from([COMSCI]));
    }

    #[test]
    fn test_umbrella_org_accesses_its_subtree() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        assert_eq!(
            tree.accessible_organizations(ALLORG),
            BTreeSet::from([ALLORG, COMSCI, MARINEBIO])
        );
    }

    #[test]
    fn test_umbrella_child_accesses_siblings_under_parent() {
        let mut orgs = fixture();
        orgs.push(org(7, "BIOHUB", HierarchyLevel::Program, Some(ALLORG), Some("ALL"), None));
        let tree = OrganizationTree::new(&orgs);

        assert_eq!(
            tree.accessible_organizations(7),
            BTreeSet::from([ALLORG, COMSCI, MARINEBIO, 7])
        );
    }

    #[test]
    fn test_program_scope_matches_program_type_only() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        let scope = tree.scope_for_officer(&officer(COMSCI, false));

        assert!(scope.covers_course(&course("COMPUTER_SCIENCE", CAS)));
        assert!(!scope.covers_course(&course("MARINE_BIOLOGY", CAS)));
    }

    #[test]
    fn test_umbrella_scope_is_superset_of_program_scopes() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        let umbrella = tree.scope_for_officer(&officer(ALLORG, false));

        for program_org in [COMSCI, MARINEBIO] {
            let program = tree.scope_for_officer(&officer(program_org, false));
            assert!(program.program_types.is_subset(&umbrella.program_types));
            assert!(program.organization_ids.is_subset(&umbrella.organization_ids));
        }
        assert!(!umbrella.covers_course(&course("COMPENDIUM", CAS)));
    }

    #[test]
    fn test_college_org_without_affiliation_matches_by_college() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        let scope = tree.scope_for_officer(&officer(CAS_COUNCIL, false));

        assert!(scope.covers_course(&course("MARINE_BIOLOGY", CAS)));
        assert!(!scope.covers_course(&course("ACCOUNTANCY", CBM)));
    }

    #[test]
    fn test_program_org_without_affiliation_covers_nobody() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        let scope = tree.scope_for_officer(&officer(ORPHAN, false));

        assert!(scope.covers_no_students());
        assert!(scope.includes_organization(ORPHAN));
    }

    #[test]
    fn test_super_officer_is_unrestricted() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);
        let scope = tree.scope_for_officer(&officer(ORPHAN, true));

        assert!(scope.unrestricted);
        assert!(scope.covers_course(&course("ANYTHING", CBM)));
        assert!(scope.includes_organization(COMPENDIUM));
    }

    #[test]
    fn test_cycle_in_hierarchy_terminates() {
        use HierarchyLevel::*;
        let orgs = vec![
            org(10, "A", Program, Some(11), Some("ALL"), None),
            org(11, "B", Program, Some(10), Some("BIOLOGY"), None),
        ];
        let tree = OrganizationTree::new(&orgs);

        assert_eq!(tree.ancestors_inclusive(10).len(), 2);
        assert_eq!(tree.accessible_organizations(10), BTreeSet::from([10, 11]));
        assert_eq!(tree.resolved_college(10), None);
    }

    #[test]
    fn test_eligible_organizations_for_course() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);

        let codes: Vec<&str> = tree
            .eligible_organizations(&course("COMPUTER_SCIENCE", CAS))
            .into_iter()
            .map(|o| o.code.as_str())
            .collect();

        assert_eq!(codes, vec!["ALLORG", "CASSC", "COMSCI"]);
    }

    #[test]
    fn test_can_promote_requires_flag_and_scope() {
        let orgs = fixture();
        let tree = OrganizationTree::new(&orgs);

        let comsci = officer(COMSCI, false);
        let scope = tree.scope_for_officer(&comsci);
        assert!(can_promote(&comsci, &scope, COMSCI));
        assert!(!can_promote(&comsci, &scope, MARINEBIO));

        let mut no_flag = officer(ALLORG, false);
        no_flag.capabilities.can_promote_officers = false;
        let scope = tree.scope_for_officer(&no_flag);
        assert!(!can_promote(&no_flag, &scope, COMSCI));
    }
}
