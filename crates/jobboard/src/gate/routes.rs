use crate::session::Role;

use super::NavigationRequest;

/// Destination every unauthenticated visitor is sent to.
pub const SIGN_IN_PATH: &str = "/login";

/// Pages that always render the public chrome, signed in or not.
const AUTH_PAGES: [&str; 5] = [
    "/",
    "/login",
    "/signup",
    "/signup/employer",
    "/signup/job-seeker",
];

/// How a path may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(Option<Role>),
}

/// Known destinations and their access rules.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(&'static str, Access)>,
}

impl RouteTable {
    pub fn standard() -> Self {
        let employer = Access::Protected(Some(Role::Employer));
        let seeker = Access::Protected(Some(Role::JobSeeker));

        Self {
            routes: vec![
                ("/", Access::Public),
                ("/find-jobs", Access::Public),
                ("/login", Access::Public),
                ("/signup", Access::Public),
                ("/signup/employer", Access::Public),
                ("/signup/job-seeker", Access::Public),
                ("/employer", employer),
                ("/employer/post-job", employer),
                ("/employer/candidates", employer),
                ("/employer/pricing", employer),
                ("/employer/profile", employer),
                ("/employer/complete-profile", employer),
                ("/profile", seeker),
                ("/jobseeker/complete-profile", seeker),
            ],
        }
    }

    pub fn access(&self, path: &str) -> Option<Access> {
        let path = normalize_path(path);
        self.routes
            .iter()
            .find(|(route, _)| *route == path)
            .map(|(_, access)| *access)
    }

    /// Build the gate request for `path`. Unknown paths require authentication but no role.
    pub fn request_for(&self, path: &str) -> Option<NavigationRequest> {
        match self.access(path) {
            Some(Access::Public) => None,
            Some(Access::Protected(role)) => Some(NavigationRequest {
                target_path: normalize_path(path).to_string(),
                required_role: role,
            }),
            None => Some(NavigationRequest::new(normalize_path(path))),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.iter().map(|(route, _)| *route)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Strip query, fragment, and trailing slash so `/employer/?tab=1` matches `/employer`.
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

pub(crate) fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.contains(&normalize_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_queries_and_trailing_slashes() {
        assert_eq!(normalize_path("/employer/?tab=pending"), "/employer");
        assert_eq!(normalize_path("/profile#cv"), "/profile");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn completion_destinations_require_their_own_role() {
        let table = RouteTable::standard();
        for role in Role::ALL {
            assert_eq!(
                table.access(role.completion_path()),
                Some(Access::Protected(Some(role)))
            );
        }
    }

    #[test]
    fn unknown_paths_still_require_a_session() {
        let table = RouteTable::standard();
        let request = table.request_for("/messages").expect("gated");
        assert_eq!(request.required_role, None);
        assert!(table.request_for("/find-jobs").is_none());
    }
}
