use crate::infra::{load_asset, Collaborators};
use clap::Args;
use jobboard::config::{AppConfig, UploadConfig};
use jobboard::error::AppError;
use jobboard::profile::{AssetUpload, EmployerProfileForm, JobSeekerProfileForm};
use jobboard::session::Credential;
use jobboard::{
    AccessGate, ApplicationStatus, ApplicationStatusEngine, ApplicationStore, GateDecision,
    JobListing, MemoryAssetUploader, MemoryDocumentStore, MemoryIdentityProvider,
    ProfileCompletionFlow, ProfileForm, Role, Session, SessionStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Logo used for the rejected-upload scenario. Defaults to a generated 2 MiB PNG.
    #[arg(long)]
    pub(crate) logo: Option<PathBuf>,
    /// Skip the application decision portion of the demo.
    #[arg(long)]
    pub(crate) skip_applications: bool,
}

type Sessions = SessionStore<MemoryIdentityProvider, MemoryDocumentStore>;
type Profiles = ProfileCompletionFlow<MemoryIdentityProvider, MemoryDocumentStore, MemoryAssetUploader>;

/// One browser: its own identity provider and session, shared backend services.
struct DemoVisitor {
    identity: Arc<MemoryIdentityProvider>,
    sessions: Arc<Sessions>,
    profiles: Profiles,
}

impl DemoVisitor {
    fn new(
        collaborators: &Collaborators,
        uploader: &Arc<MemoryAssetUploader>,
        uploads: UploadConfig,
    ) -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let sessions = SessionStore::new(identity.clone(), collaborators.documents.clone());
        let profiles = ProfileCompletionFlow::new(
            sessions.clone(),
            collaborators.documents.clone(),
            uploader.clone(),
            uploads,
        );
        Self {
            identity,
            sessions,
            profiles,
        }
    }

    async fn sign_up(&self, role: Role, user_id: &str, email: &str) -> Session {
        self.sessions.select_sign_up_role(role);
        self.identity
            .sign_in(Credential::new(user_id).with_email(email));
        self.sessions.refresh().await
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let collaborators = Collaborators::in_memory();
    let uploader = Arc::new(MemoryAssetUploader::new());
    let gate = AccessGate::default();

    println!("Job marketplace demo");
    println!(
        "Upload limit: {} bytes per asset",
        config.uploads.max_asset_bytes
    );

    let employer = DemoVisitor::new(&collaborators, &uploader, config.uploads);
    let session = employer
        .sign_up(Role::Employer, "emp-medrin", "hr@medrin.example")
        .await;
    println!("\nNew employer signs up");
    print_session(&session);
    print_navigation(&gate, &session, "/employer/post-job");

    println!("\nEmployer submits the company profile with an oversized logo");
    let oversized = match args.logo {
        Some(path) => load_asset(&path)?,
        None => AssetUpload::new("logo.png", "image/png", vec![0; 2 * 1024 * 1024]),
    };
    let uploads_before = uploader.stored().len();
    match employer
        .profiles
        .submit(ProfileForm::Employer(company_profile(Some(oversized))))
        .await
    {
        Ok(_) => println!("  Profile accepted"),
        Err(err) => println!("  Rejected ({}): {}", err.kind().label(), err),
    }
    println!(
        "  Uploads attempted: {}",
        uploader.stored().len() - uploads_before
    );
    print_session(&employer.sessions.session());

    println!("\nEmployer retries with a small logo");
    let logo = AssetUpload::new("logo.png", "image/png", vec![0; 16 * 1024]);
    employer
        .profiles
        .submit(ProfileForm::Employer(company_profile(Some(logo))))
        .await?;
    let session = employer.sessions.session();
    print_session(&session);
    print_navigation(&gate, &session, "/employer/post-job");

    let seeker = DemoVisitor::new(&collaborators, &uploader, config.uploads);
    seeker
        .sign_up(Role::JobSeeker, "seeker-amina", "amina@example.com")
        .await;
    seeker
        .profiles
        .submit(ProfileForm::JobSeeker(seeker_profile()))
        .await?;
    let seeker_session = seeker.sessions.session();
    println!("\nJob seeker completes their profile");
    print_session(&seeker_session);
    print_navigation(&gate, &seeker_session, "/employer");
    print_navigation(&gate, &seeker_session, "/profile");

    if !args.skip_applications {
        run_application_demo(&collaborators, &seeker_session, &session).await?;
    }

    seeker.sessions.sign_out().await?;
    println!("\nJob seeker signs out");
    print_navigation(&gate, &seeker.sessions.session(), "/profile");

    Ok(())
}

async fn run_application_demo(
    collaborators: &Collaborators,
    seeker: &Session,
    employer: &Session,
) -> Result<(), AppError> {
    let store = ApplicationStore::new(collaborators.documents.clone());
    let engine = ApplicationStatusEngine::new(collaborators.documents.clone());
    let Some(employer_id) = employer.visitor().map(|visitor| visitor.user_id.clone()) else {
        println!("\nApplication demo skipped: employer session not ready");
        return Ok(());
    };

    let listing = JobListing {
        job_id: "job-sre-01".to_string(),
        job_title: "Site Reliability Engineer".to_string(),
        company_name: "Medrin".to_string(),
        employer_id: employer_id.clone(),
    };

    println!("\nApplication decisions");
    let application = store.apply(seeker, &listing).await?;
    println!("  {} applied: {}", application.applicant_id, application.id);

    let board = store.fetch(employer).await?;
    let accepted = engine
        .resolve(&board, &application.id, ApplicationStatus::Accepted)
        .await?;
    println!("  Employer accepted: status {}", accepted.status);

    match engine
        .transition(&employer_id, &application.id, ApplicationStatus::Rejected)
        .await
    {
        Ok(record) => println!("  Second decision unexpectedly applied: {}", record.status),
        Err(err) => println!("  Second decision refused ({}): {}", err.kind().label(), err),
    }

    let view = store.fetch(seeker).await?.view();
    println!(
        "  Seeker board: {} pending, {} accepted, {} rejected",
        view.counts.pending, view.counts.accepted, view.counts.rejected
    );
    board.close();
    Ok(())
}

fn company_profile(logo: Option<AssetUpload>) -> EmployerProfileForm {
    EmployerProfileForm {
        company_name: "Medrin".to_string(),
        location: "Nairobi".to_string(),
        description: "Hiring platform for East African teams".to_string(),
        mission: "Match talent with meaningful work".to_string(),
        vision: "Nobody left out of the labour market".to_string(),
        logo,
    }
}

fn seeker_profile() -> JobSeekerProfileForm {
    JobSeekerProfileForm {
        firstname: "Amina".to_string(),
        lastname: "Otieno".to_string(),
        location: "Mombasa".to_string(),
        phone: "+254700000000".to_string(),
        date_of_birth: "1996-05-14".to_string(),
        profile_image: None,
        cv: Some(AssetUpload::new("cv.pdf", "application/pdf", vec![0; 32 * 1024])),
    }
}

fn print_session(session: &Session) {
    match session.visitor() {
        Some(visitor) => println!(
            "  Session: {} as {} (profile {})",
            visitor.user_id,
            visitor.role,
            if visitor.profile_complete {
                "complete"
            } else {
                "incomplete"
            }
        ),
        None => println!("  Session: {:?}", session.loading_state()),
    }
}

fn print_navigation(gate: &AccessGate, session: &Session, path: &str) {
    match gate.navigate(session, path) {
        GateDecision::Allow => println!("  {path}: allowed"),
        GateDecision::Wait => println!("  {path}: waiting for session"),
        GateDecision::Redirect { to, reason, .. } => {
            println!("  {path}: redirected to {to} ({reason:?})")
        }
    }
}
