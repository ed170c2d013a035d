//! Renewal of expired magic links.
//!
//! Given an expired (or otherwise rejected) token and the URL the user was
//! visiting, re-derives who the link belonged to from convention and agency
//! data, then sends each matching recipient a fresh link. Recipient identity
//! is only ever taken from the database; the token at most narrows it down
//! through its email hash, and only when signed with the current key.

use std::sync::Arc;

use chrono::Duration;
use percent_encoding::percent_decode_str;
use serde_json::json;
use uuid::Uuid;

use super::magic_link_authority::{
    IssueMagicLink, MagicLinkAuthority, STATUS_DASHBOARD_TTL_DAYS, make_email_hash,
};
use super::notification_dispatcher::NotificationDispatcher;
use super::short_link_service::ShortLinkService;
use crate::domain::clock::Clock;
use crate::domain::entities::{
    Agency, Convention, EventPayload, FollowedIds, FrontRoute, MagicLinkRenewalRequestedPayload,
    NotificationDraft, RENEWABLE_ROUTES, Role, TemplatedEmail, TokenClassification,
};
use crate::domain::entities::notification::dedupe_preserving_order;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer, finish};
use crate::error::AppError;

/// Email template kind of renewal notifications.
pub const MAGIC_LINK_RENEWAL_EMAIL_KIND: &str = "MAGIC_LINK_RENEWAL";

const BACK_OFFICE_MESSAGE: &str = "Le backoffice n'a pas de liens magiques.";
const EMAIL_HASH_MISMATCH_MESSAGE: &str =
    "Le lien magique n'est plus associé à cette demande d'immersion";

#[derive(Debug, Clone)]
pub struct RenewMagicLink {
    pub expired_jwt: String,
    pub original_url: String,
}

/// Who a renewal request is for, after token classification.
struct RenewalSubject {
    application_id: String,
    role: Role,
    email_hash: Option<String>,
}

pub struct MagicLinkRenewalService {
    uow_performer: Arc<dyn UnitOfWorkPerformer>,
    authority: Arc<MagicLinkAuthority>,
    short_links: Arc<ShortLinkService>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    magic_link_ttl: Duration,
}

impl MagicLinkRenewalService {
    pub fn new(
        uow_performer: Arc<dyn UnitOfWorkPerformer>,
        authority: Arc<MagicLinkAuthority>,
        short_links: Arc<ShortLinkService>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        magic_link_ttl: Duration,
    ) -> Self {
        Self {
            uow_performer,
            authority,
            short_links,
            dispatcher,
            clock,
            magic_link_ttl,
        }
    }

    /// Sends fresh magic links for the convention and role of `request.expired_jwt`.
    ///
    /// Every check runs before the first write, and all writes share one unit
    /// of work: either every recipient gets a notification or none does.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`]: malformed token, back office role,
    ///   unsupported role, missing agency or actor, stale email hash,
    ///   unsupported route
    /// - [`AppError::Forbidden`]: token not signed by any known key
    /// - [`AppError::NotFound`]: unknown convention
    #[tracing::instrument(
        skip_all,
        fields(
            convention_id = tracing::field::Empty,
            role = tracing::field::Empty,
        )
    )]
    pub async fn renew(&self, request: RenewMagicLink) -> Result<(), AppError> {
        let subject = self.authenticate(&request.expired_jwt)?;

        let span = tracing::Span::current();
        span.record("convention_id", subject.application_id.as_str());
        span.record("role", subject.role.as_str());

        if subject.role == Role::BackOffice {
            return Err(AppError::bad_request(BACK_OFFICE_MESSAGE, json!({})));
        }

        let uow = self.uow_performer.begin().await?;
        let outcome = self
            .renew_in(uow.as_ref(), &subject, &request.original_url)
            .await;
        finish(uow, outcome).await
    }

    fn authenticate(&self, token: &str) -> Result<RenewalSubject, AppError> {
        match self.authority.classify(token) {
            TokenClassification::Trusted(claims) => Ok(RenewalSubject {
                application_id: claims.application_id().to_string(),
                role: claims.role(),
                email_hash: claims.email_hash().map(str::to_string),
            }),
            TokenClassification::PartiallyTrusted(claims) => Ok(RenewalSubject {
                application_id: claims.application_id,
                role: claims.role,
                email_hash: None,
            }),
            TokenClassification::Untrusted => {
                tracing::warn!("Renewal requested with a token signed by an unknown key");
                Err(AppError::forbidden(
                    "Token signature could not be verified",
                    json!({}),
                ))
            }
            TokenClassification::Malformed => {
                Err(AppError::bad_request("malformed token", json!({})))
            }
        }
    }

    async fn renew_in(
        &self,
        uow: &dyn UnitOfWork,
        subject: &RenewalSubject,
        original_url: &str,
    ) -> Result<(), AppError> {
        let convention = load_convention(uow, &subject.application_id).await?;
        let agency = uow
            .agencies()
            .get_by_id(convention.agency_id)
            .await?
            .ok_or_else(|| {
                AppError::bad_request(
                    convention.agency_id.to_string(),
                    json!({ "agency_id": convention.agency_id }),
                )
            })?;

        let candidates = role_to_candidate_emails(subject.role, &convention, &agency)?;
        let emails = match &subject.email_hash {
            Some(hash) => candidates
                .into_iter()
                .filter(|email| make_email_hash(email) == *hash)
                .collect(),
            None => candidates,
        };
        let emails = dedupe_preserving_order(emails);
        if emails.is_empty() {
            return Err(AppError::bad_request(
                EMAIL_HASH_MISMATCH_MESSAGE,
                json!({ "convention_id": convention.id, "role": subject.role.as_str() }),
            ));
        }

        let route = resolve_renewable_route(original_url)?;

        for email in emails {
            self.send_renewed_link(uow, &convention, &agency, subject.role, &email, route)
                .await?;
        }

        tracing::info!("Magic link renewed");
        Ok(())
    }

    async fn send_renewed_link(
        &self,
        uow: &dyn UnitOfWork,
        convention: &Convention,
        agency: &Agency,
        role: Role,
        email: &str,
        route: FrontRoute,
    ) -> Result<(), AppError> {
        let now = self.clock.now();
        let subject_id = convention.id.to_string();

        let magic_link = self.authority.issue_link(
            IssueMagicLink {
                subject_id: &subject_id,
                role,
                email,
                now,
                ttl: self.magic_link_ttl,
            },
            route,
        )?;
        let status_link = self.authority.issue_link(
            IssueMagicLink {
                subject_id: &subject_id,
                role,
                email,
                now,
                ttl: Duration::days(STATUS_DASHBOARD_TTL_DAYS),
            },
            FrontRoute::ConventionStatusDashboard,
        )?;

        let magic_link = self.short_links.shorten(uow, &magic_link).await?;
        let convention_status_link = self.short_links.shorten(uow, &status_link).await?;
        let beneficiary = &convention.signatories.beneficiary;

        self.dispatcher
            .save_and_enqueue(
                uow,
                NotificationDraft::Email {
                    followed_ids: FollowedIds {
                        convention_id: Some(convention.id),
                        agency_id: Some(convention.agency_id),
                        establishment_siret: None,
                    },
                    templated_content: TemplatedEmail {
                        kind: MAGIC_LINK_RENEWAL_EMAIL_KIND.to_string(),
                        recipients: vec![email.to_string()],
                        cc: Vec::new(),
                        params: json!({
                            "internshipKind": convention.internship_kind,
                            "beneficiaryFirstName": beneficiary.first_name,
                            "beneficiaryLastName": beneficiary.last_name,
                            "agencyName": agency.name,
                            "magicLink": magic_link,
                            "conventionStatusLink": convention_status_link,
                        }),
                    },
                },
            )
            .await?;

        self.dispatcher
            .append_event(
                uow,
                EventPayload::MagicLinkRenewalRequested(MagicLinkRenewalRequestedPayload {
                    internship_kind: convention.internship_kind,
                    emails: vec![email.to_string()],
                    magic_link,
                    convention_status_link,
                    convention_id: convention.id,
                }),
            )
            .await?;

        Ok(())
    }
}

async fn load_convention(uow: &dyn UnitOfWork, application_id: &str) -> Result<Convention, AppError> {
    let not_found =
        || AppError::not_found(application_id, json!({ "convention_id": application_id }));

    let id = Uuid::parse_str(application_id).map_err(|_| not_found())?;
    uow.conventions().get_by_id(id).await?.ok_or_else(not_found)
}

/// Authoritative email addresses for `role` on `convention`.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for roles without magic links (back office,
/// establishment tutor) and when the convention lacks the actor the role
/// designates.
pub fn role_to_candidate_emails(
    role: Role,
    convention: &Convention,
    agency: &Agency,
) -> Result<Vec<String>, AppError> {
    let missing_actor = || {
        AppError::bad_request(
            format!("No actor with role {role} on this convention"),
            json!({ "convention_id": convention.id, "role": role.as_str() }),
        )
    };

    match role {
        Role::Beneficiary => Ok(vec![convention.signatories.beneficiary.email.clone()]),
        Role::EstablishmentRepresentative => Ok(vec![
            convention
                .signatories
                .establishment_representative
                .email
                .clone(),
        ]),
        Role::BeneficiaryRepresentative => convention
            .signatories
            .beneficiary_representative
            .as_ref()
            .map(|actor| vec![actor.email.clone()])
            .ok_or_else(missing_actor),
        Role::BeneficiaryCurrentEmployer => convention
            .signatories
            .beneficiary_current_employer
            .as_ref()
            .map(|actor| vec![actor.email.clone()])
            .ok_or_else(missing_actor),
        Role::Counsellor => Ok(agency.counsellor_emails.clone()),
        Role::Validator => Ok(agency.validator_emails.clone()),
        Role::EstablishmentTutor => Err(AppError::bad_request(
            format!("Role {role} is not supported for magic link renewal"),
            json!({ "role": role.as_str() }),
        )),
        Role::BackOffice => Err(AppError::bad_request(BACK_OFFICE_MESSAGE, json!({}))),
    }
}

/// First renewable route whose `/{route}` appears in the decoded URL.
///
/// # Errors
///
/// Returns [`AppError::Validation`] listing the supported routes when none matches.
pub fn resolve_renewable_route(original_url: &str) -> Result<FrontRoute, AppError> {
    let decoded = percent_decode_str(original_url).decode_utf8_lossy();

    RENEWABLE_ROUTES
        .into_iter()
        .find(|route| decoded.contains(&format!("/{}", route.path())))
        .ok_or_else(|| {
            let supported: Vec<String> = RENEWABLE_ROUTES
                .iter()
                .map(|route| format!("/{}", route.path()))
                .collect();
            AppError::bad_request(
                format!(
                    "Wrong link format, should be one of the supported route: {}. It was : {original_url}",
                    supported.join(", ")
                ),
                json!({ "supported_routes": supported }),
            )
        })
}
