//! Access gate deciding whether a navigation may render its destination.

mod router;
pub mod routes;

pub use router::gate_router;
pub use routes::{normalize_path, Access, RouteTable, SIGN_IN_PATH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::{Role, Session};

/// One navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub target_path: String,
    #[serde(default)]
    pub required_role: Option<Role>,
}

impl NavigationRequest {
    pub fn new(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            required_role: None,
        }
    }

    pub fn requiring(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    Unauthenticated,
    RoleMismatch,
    IncompleteProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Session still loading; show a spinner and ask again once it settles.
    Wait,
    Allow,
    Redirect {
        to: String,
        reason: RedirectReason,
        /// Path sign-in should resume at.
        #[serde(skip_serializing_if = "Option::is_none")]
        resume: Option<String>,
    },
}

impl GateDecision {
    fn redirect(to: &str, reason: RedirectReason) -> Self {
        GateDecision::Redirect {
            to: to.to_string(),
            reason,
            resume: None,
        }
    }
}

/// Decide reachability of `request` for `session`.
///
/// Checks run in a fixed order and the first failing one wins: loading, authentication,
/// role, profile completeness. Role is checked before completeness so a visitor is never
/// sent to another role's completion page.
pub fn decide(session: &Session, request: &NavigationRequest) -> GateDecision {
    let visitor = match session {
        Session::Pending => return GateDecision::Wait,
        Session::Absent | Session::Error { .. } => {
            return GateDecision::Redirect {
                to: SIGN_IN_PATH.to_string(),
                reason: RedirectReason::Unauthenticated,
                resume: Some(request.target_path.clone()),
            }
        }
        Session::Ready(visitor) => visitor,
    };

    if let Some(required) = request.required_role {
        if required != visitor.role {
            return GateDecision::redirect(
                visitor.role.landing_path(),
                RedirectReason::RoleMismatch,
            );
        }
    }

    let completion = visitor.role.completion_path();
    if !visitor.profile_complete && normalize_path(&request.target_path) != completion {
        return GateDecision::redirect(completion, RedirectReason::IncompleteProfile);
    }

    GateDecision::Allow
}

/// Navigation chrome selected for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Chrome {
    Public,
    Employer,
    JobSeeker,
}

/// Route-table aware front door to [`decide`].
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    routes: RouteTable,
}

impl AccessGate {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn navigate(&self, session: &Session, path: &str) -> GateDecision {
        let Some(request) = self.routes.request_for(path) else {
            return GateDecision::Allow;
        };

        let decision = decide(session, &request);
        if let GateDecision::Redirect { to, reason, .. } = &decision {
            debug!(path = %request.target_path, to = %to, ?reason, "navigation redirected");
        }
        decision
    }

    pub fn chrome_for(&self, session: &Session, path: &str) -> Chrome {
        if routes::is_auth_page(path) {
            return Chrome::Public;
        }

        match session.visitor().map(|visitor| visitor.role) {
            Some(Role::Employer) => Chrome::Employer,
            Some(Role::JobSeeker) => Chrome::JobSeeker,
            None => Chrome::Public,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{UserId, Visitor};

    fn ready(role: Role, profile_complete: bool) -> Session {
        Session::Ready(Visitor {
            user_id: UserId::new("u1"),
            role,
            profile_complete,
            email: None,
        })
    }

    fn unsettled_sessions() -> Vec<Session> {
        vec![
            Session::Absent,
            Session::Error {
                reason: "offline".to_string(),
            },
        ]
    }

    #[test]
    fn pending_session_waits() {
        let request = NavigationRequest::new("/employer").requiring(Role::Employer);
        assert_eq!(decide(&Session::Pending, &request), GateDecision::Wait);
    }

    #[test]
    fn absent_or_errored_sessions_go_to_sign_in_with_resume_path() {
        let gate = AccessGate::default();
        for session in unsettled_sessions() {
            for path in gate.routes().paths() {
                let request = NavigationRequest::new(path);
                assert_eq!(
                    decide(&session, &request),
                    GateDecision::Redirect {
                        to: SIGN_IN_PATH.to_string(),
                        reason: RedirectReason::Unauthenticated,
                        resume: Some(path.to_string()),
                    }
                );
            }
        }
    }

    #[test]
    fn cross_role_requests_land_on_own_default() {
        for role in Role::ALL {
            for other in Role::ALL.into_iter().filter(|other| *other != role) {
                for complete in [true, false] {
                    let request = NavigationRequest::new(other.completion_path()).requiring(other);
                    assert_eq!(
                        decide(&ready(role, complete), &request),
                        GateDecision::Redirect {
                            to: role.landing_path().to_string(),
                            reason: RedirectReason::RoleMismatch,
                            resume: None,
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn complete_profiles_meeting_role_are_allowed() {
        let gate = AccessGate::default();
        for path in gate.routes().paths() {
            if let Some(request) = gate.routes().request_for(path) {
                let role = request.required_role.unwrap_or(Role::Employer);
                assert_eq!(decide(&ready(role, true), &request), GateDecision::Allow);
            }
        }
    }

    #[test]
    fn incomplete_employer_is_sent_to_completion() {
        let request = NavigationRequest::new("/employer/post-job").requiring(Role::Employer);
        assert_eq!(
            decide(&ready(Role::Employer, false), &request),
            GateDecision::Redirect {
                to: "/employer/complete-profile".to_string(),
                reason: RedirectReason::IncompleteProfile,
                resume: None,
            }
        );
    }

    #[test]
    fn seeker_requesting_employer_dashboard_goes_to_find_jobs() {
        let request = NavigationRequest::new("/employer").requiring(Role::Employer);
        assert_eq!(
            decide(&ready(Role::JobSeeker, true), &request),
            GateDecision::Redirect {
                to: "/find-jobs".to_string(),
                reason: RedirectReason::RoleMismatch,
                resume: None,
            }
        );
    }

    #[test]
    fn incomplete_visitor_may_reach_own_completion_page_only() {
        let session = ready(Role::JobSeeker, false);
        let own = NavigationRequest::new("/jobseeker/complete-profile/").requiring(Role::JobSeeker);
        assert_eq!(decide(&session, &own), GateDecision::Allow);

        let unrestricted = NavigationRequest::new("/employer/complete-profile");
        assert!(matches!(
            decide(&session, &unrestricted),
            GateDecision::Redirect {
                reason: RedirectReason::IncompleteProfile,
                ..
            }
        ));
    }

    #[test]
    fn redirect_chains_terminate_without_loops() {
        let gate = AccessGate::default();
        let mut sessions = unsettled_sessions();
        for role in Role::ALL {
            sessions.push(ready(role, true));
            sessions.push(ready(role, false));
        }

        for session in &sessions {
            for start in gate.routes().paths().chain(["/messages"]) {
                let mut path = start.to_string();
                let mut hops = 0;
                loop {
                    match gate.navigate(session, &path) {
                        GateDecision::Allow => break,
                        GateDecision::Redirect { to, .. } => {
                            assert_ne!(to, path, "redirect to self from {path}");
                            path = to;
                            hops += 1;
                        }
                        GateDecision::Wait => panic!("settled session waited"),
                    }
                    assert!(hops <= 3, "redirect chain too long from {start} for {session:?}");
                }

                if let Some(visitor) = session.visitor() {
                    if !visitor.profile_complete && gate.routes().request_for(&path).is_some() {
                        assert_eq!(path, visitor.role.completion_path());
                    }
                }
            }
        }
    }

    #[test]
    fn public_paths_skip_the_gate() {
        let gate = AccessGate::default();
        assert_eq!(gate.navigate(&Session::Absent, "/find-jobs"), GateDecision::Allow);
        assert_eq!(gate.navigate(&Session::Pending, "/login"), GateDecision::Allow);
    }

    #[test]
    fn chrome_follows_role_outside_auth_pages() {
        let gate = AccessGate::default();
        let employer = ready(Role::Employer, true);
        assert_eq!(gate.chrome_for(&employer, "/login"), Chrome::Public);
        assert_eq!(gate.chrome_for(&employer, "/"), Chrome::Public);
        assert_eq!(gate.chrome_for(&employer, "/employer/candidates"), Chrome::Employer);
        assert_eq!(
            gate.chrome_for(&ready(Role::JobSeeker, false), "/find-jobs"),
            Chrome::JobSeeker
        );
        assert_eq!(gate.chrome_for(&Session::Absent, "/find-jobs"), Chrome::Public);
    }
}
