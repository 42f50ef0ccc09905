// src/sources/catalog.rs
//! Known upstream listing APIs and their field mappings.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{
    data_envelope, filters, jobs_envelope, text, text_or, JobRecord, SourceDescriptor,
    SourceRequest,
};
use crate::clock::Clock;
use crate::error::AggregatorError;

/// Sources enabled when configuration does not name any.
pub const DEFAULT_SOURCES: [&str; 3] = ["JobsAPI19", "JSearchJobs", "LinkedInJobs"];

/// Every source this service knows how to call, in canonical order.
///
/// Date-dependent request parameters are computed from `clock` once, here.
pub fn catalog(clock: &dyn Clock) -> Vec<SourceDescriptor> {
    let yesterday = clock.yesterday();
    vec![
        jobs_api19(),
        jsearch(),
        linkedin(yesterday),
        active_jobs_db(yesterday),
        jobs_search_api(),
    ]
}

/// Select `names` from the catalog, in the given order.
pub fn build_registry(
    names: &[String],
    clock: &dyn Clock,
) -> Result<Vec<SourceDescriptor>, AggregatorError> {
    let mut all = catalog(clock);
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(AggregatorError::Configuration(format!(
                "source '{name}' is listed more than once"
            )));
        }
        let idx = all
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AggregatorError::Configuration(format!("unknown source '{name}'")))?;
        out.push(all.swap_remove(idx));
    }
    Ok(out)
}

fn get_params(pairs: &[(&str, &str)]) -> SourceRequest {
    SourceRequest::Get {
        params: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn jobs_api19() -> SourceDescriptor {
    SourceDescriptor {
        name: "JobsAPI19".into(),
        endpoint: "https://jobs-api19.p.rapidapi.com/jobs".into(),
        // Larger page so enough survive the date filter.
        request: get_params(&[("limit", "50")]),
        extract: data_envelope,
        normalize: normalize_jobs_api19,
        filter: Some(filters::posted_today_or_yesterday),
    }
}

pub fn normalize_jobs_api19(job: &Value) -> JobRecord {
    JobRecord {
        id: text(job, "id"),
        title: text(job, "title"),
        organization: text(job, "company"),
        location: text(job, "location"),
        url: text(job, "apply_link"),
        description: text(job, "job_description"),
        date_posted: text(job, "posted_date"),
        employment_type: text(job, "job_type"),
        salary: text(job, "salary"),
        category: text(job, "category"),
        remote_onsite: text(job, "remote_onsite"),
        contact_email: text(job, "contact_email"),
        source: "JobsAPI19".into(),
    }
}

fn jsearch() -> SourceDescriptor {
    SourceDescriptor {
        name: "JSearchJobs".into(),
        endpoint: "https://jsearch.p.rapidapi.com/search".into(),
        request: get_params(&[
            ("query", "software"),
            ("page", "1"),
            ("num_pages", "1"),
            ("country", "in"),
            ("date_posted", "today"),
            ("job_requirements", "no_experience"),
        ]),
        extract: data_envelope,
        normalize: normalize_jsearch,
        filter: None,
    }
}

pub fn normalize_jsearch(job: &Value) -> JobRecord {
    JobRecord {
        id: text(job, "job_id"),
        title: text(job, "job_title"),
        organization: text(job, "employer_name"),
        location: text(job, "job_location"),
        url: text(job, "job_apply_link"),
        description: text(job, "job_description"),
        date_posted: text(job, "job_posted_at_datetime_utc"),
        employment_type: text(job, "job_employment_types"),
        salary: text(job, "salary"),
        category: text(job, "category"),
        remote_onsite: text(job, "remote_onsite"),
        contact_email: text(job, "contact_email"),
        source: "JSearch".into(),
    }
}

fn linkedin(yesterday: NaiveDate) -> SourceDescriptor {
    let date_filter = yesterday.format("%Y-%m-%d").to_string();
    SourceDescriptor {
        name: "LinkedInJobs".into(),
        endpoint: "https://linkedin-job-search-api.p.rapidapi.com/active-jb-24h".into(),
        request: get_params(&[
            ("limit", "50"),
            ("offset", "0"),
            ("title_filter", "\"Software\""),
            ("location_filter", "\"India\""),
            ("date_filter", date_filter.as_str()),
            ("ai_experience_level_filter", "0-2"),
        ]),
        extract: data_envelope,
        normalize: normalize_linkedin,
        filter: None,
    }
}

pub fn normalize_linkedin(job: &Value) -> JobRecord {
    JobRecord {
        source: "LinkedInJobs".into(),
        ..ats_record(job)
    }
}

fn active_jobs_db(yesterday: NaiveDate) -> SourceDescriptor {
    let date_filter = yesterday.format("%Y-%m-%d").to_string();
    SourceDescriptor {
        name: "ActiveJobsDB".into(),
        endpoint: "https://active-jobs-db.p.rapidapi.com/active-ats-24h".into(),
        request: get_params(&[
            ("limit", "50"),
            ("offset", "0"),
            ("title_filter", "\"Software\""),
            (
                "advanced_title_filter",
                "Software Developer | Software Engineer | Web Developer | App Developer",
            ),
            ("location_filter", "\"India\""),
            ("description_type", "text"),
            ("date_filter", date_filter.as_str()),
            ("ai_experience_level_filter", "0-2"),
        ]),
        extract: data_envelope,
        normalize: normalize_active_jobs_db,
        filter: None,
    }
}

pub fn normalize_active_jobs_db(job: &Value) -> JobRecord {
    JobRecord {
        source: "ActiveJobsDB".into(),
        ..ats_record(job)
    }
}

/// Shared field layout of the ATS-backed feeds (LinkedIn, ActiveJobsDB).
fn ats_record(job: &Value) -> JobRecord {
    JobRecord {
        id: text(job, "id"),
        title: text(job, "title"),
        organization: text(job, "organization"),
        location: text(job, "locations_derived"),
        url: text(job, "url"),
        description: text(job, "description_text"),
        date_posted: text(job, "date_posted"),
        employment_type: text(job, "employment_type"),
        salary: text(job, "salary"),
        category: text(job, "category"),
        remote_onsite: text(job, "remote_onsite"),
        contact_email: text(job, "contact_email"),
        source: String::new(),
    }
}

fn jobs_search_api() -> SourceDescriptor {
    SourceDescriptor {
        name: "JobsSearchAPI".into(),
        endpoint: "https://jobs-search-api.p.rapidapi.com/getjobs".into(),
        request: SourceRequest::Post {
            body: json!({
                "search_term": "software",
                "location": "india",
                "results_wanted": 50,
                "site_name": ["indeed", "linkedin", "zip_recruiter", "glassdoor"],
                "distance": 10000,
                "job_type": "fulltime",
                "is_remote": false,
                "linkedin_fetch_description": false,
                "hours_old": 24
            }),
        },
        extract: jobs_envelope,
        normalize: normalize_jobs_search_api,
        filter: None,
    }
}

pub fn normalize_jobs_search_api(job: &Value) -> JobRecord {
    let remote = match job.get("is_remote") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "True",
        _ => false,
    };
    JobRecord {
        id: text(job, "id"),
        title: text(job, "title"),
        organization: text(job, "company"),
        location: text(job, "location"),
        url: text(job, "job_url"),
        description: text(job, "description"),
        date_posted: text(job, "date_posted"),
        employment_type: text(job, "job_type"),
        salary: text(job, "salary_source"),
        category: text(job, "job_function"),
        remote_onsite: if remote { "Remote" } else { "Onsite" }.into(),
        contact_email: text_or(job, "emails", "N/A"),
        source: text_or(job, "site", "JobsSearchAPI"),
    }
}
