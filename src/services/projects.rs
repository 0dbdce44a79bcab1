use crate::{
    db::DbPool,
    entities::{activity, activity_followup, department, project, project_report},
    errors::ServiceError,
    services::periods::month_end,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

pub const ACTIVITY_STATUSES: [&str; 4] = ["Achieved", "In Progress", "Not Achieved", "Cancelled"];
pub const DEFAULT_ACTIVITY_STATUS: &str = "Not Achieved";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub activity_count: usize,
    pub status_counts: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOverview {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<NaiveDate>,
    pub activities: Vec<activity::Model>,
    pub monthly_summary: Vec<MonthSummary>,
    pub projects: Vec<project::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineProject {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineActivity {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectTimeline {
    pub project: TimelineProject,
    pub activities: Vec<TimelineActivity>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProject {
    #[validate(length(min = 1, message = "Project name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewActivity {
    #[validate(length(min = 1, message = "Activity name is required"))]
    pub activity_name: String,
    pub planned_date: NaiveDate,
    pub project_id: Option<i32>,
    pub department: Option<String>,
    pub intended_result: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFollowup {
    pub followup_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub comment: Option<String>,
    pub status_update: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReport {
    pub project_id: i32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[validate(length(min = 1))]
    pub summary: String,
    pub report_date: Option<NaiveDate>,
}

/// Bucket activity status counts per calendar month, each month clamped to `[start, end]`
pub fn monthly_summary(start: NaiveDate, end: NaiveDate, activities: &[activity::Model]) -> Vec<MonthSummary> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        let last = month_end(current).min(end);
        let mut status_counts: BTreeMap<String, u32> =
            ACTIVITY_STATUSES.iter().map(|s| (s.to_string(), 0)).collect();
        let in_month: Vec<&activity::Model> = activities
            .iter()
            .filter(|a| a.planned_date >= current && a.planned_date <= last)
            .collect();
        for a in &in_month {
            let key = if ACTIVITY_STATUSES.contains(&a.status.as_str()) {
                a.status.as_str()
            } else {
                DEFAULT_ACTIVITY_STATUS
            };
            *status_counts.entry(key.to_string()).or_default() += 1;
        }
        months.push(MonthSummary {
            start: current,
            end: last,
            activity_count: in_month.len(),
            status_counts,
        });
        match last.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    months
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

async fn find_or_create_department<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<department::Model, ServiceError> {
    if let Some(existing) = department::Entity::find()
        .filter(department::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let created = department::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(department = name, "department created");
    Ok(created)
}

#[derive(Clone)]
pub struct ProjectService {
    db_pool: Arc<DbPool>,
}

impl ProjectService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find_project(&self, id: i32) -> Result<project::Model, ServiceError> {
        project::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", id))
    }

    #[instrument(skip(self))]
    pub async fn overview(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ProjectOverview, ServiceError> {
        let start = start.unwrap_or_else(|| Utc::now().date_naive());
        let end = end.unwrap_or(start + Duration::days(6));
        if end < start {
            return Err(ServiceError::ValidationError(
                "End date must not be before start date".into(),
            ));
        }
        let db = &*self.db_pool;
        let activities = activity::Entity::find()
            .filter(activity::Column::PlannedDate.between(start, end))
            .order_by_asc(activity::Column::PlannedDate)
            .all(db)
            .await?;
        let projects = project::Entity::find()
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;
        Ok(ProjectOverview {
            start,
            end,
            days: days_between(start, end),
            monthly_summary: monthly_summary(start, end, &activities),
            activities,
            projects,
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_project(&self, input: NewProject) -> Result<project::Model, ServiceError> {
        input.validate()?;
        if input.start_date > input.end_date {
            return Err(ServiceError::ValidationError(
                "Start date must not be after end date".into(),
            ));
        }
        let created = project::ActiveModel {
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            start_date: Set(Some(input.start_date)),
            end_date: Set(Some(input.end_date)),
            status: Set("Active".to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(project_id = created.id, "project added");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(name = %input.activity_name))]
    pub async fn add_activity(&self, input: NewActivity) -> Result<activity::Model, ServiceError> {
        input.validate()?;
        if let Some(project_id) = input.project_id {
            self.find_project(project_id).await?;
        }
        let db = &*self.db_pool;
        let department_id = match input.department.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(find_or_create_department(db, name).await?.id),
            _ => None,
        };
        let created = activity::ActiveModel {
            project_id: Set(input.project_id),
            department_id: Set(department_id),
            activity_name: Set(input.activity_name),
            planned_date: Set(input.planned_date),
            intended_result: Set(input.intended_result),
            status: Set(DEFAULT_ACTIVITY_STATUS.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(activity_id = created.id, "activity added");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_activity_status(&self, id: i32, status: &str) -> Result<activity::Model, ServiceError> {
        if !ACTIVITY_STATUSES.contains(&status) {
            return Err(ServiceError::ValidationError(format!("Invalid status: {}", status)));
        }
        let existing = activity::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Activity", id))?;
        let mut active = existing.into_active_model();
        active.status = Set(status.to_string());
        let updated = active.update(&*self.db_pool).await?;
        info!(activity_id = id, status, "activity status updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn project_activities(&self, project_id: i32) -> Result<ProjectTimeline, ServiceError> {
        let project = self.find_project(project_id).await?;
        let activities = activity::Entity::find()
            .filter(activity::Column::ProjectId.eq(project_id))
            .order_by_asc(activity::Column::PlannedDate)
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|a| TimelineActivity {
                id: a.id,
                name: a.activity_name,
                start_date: a.planned_date,
                end_date: a.planned_date + Duration::days(1),
                status: a.status,
            })
            .collect();
        Ok(ProjectTimeline {
            project: TimelineProject {
                name: project.name,
                start_date: project.start_date,
                end_date: project.end_date,
            },
            activities,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn add_followup(
        &self,
        activity_id: i32,
        input: NewFollowup,
    ) -> Result<activity_followup::Model, ServiceError> {
        let db = &*self.db_pool;
        activity::Entity::find_by_id(activity_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Activity", activity_id))?;
        if let Some(status) = input.status_update.as_deref() {
            if !ACTIVITY_STATUSES.contains(&status) {
                return Err(ServiceError::ValidationError(format!("Invalid status: {}", status)));
            }
        }
        Ok(activity_followup::ActiveModel {
            activity_id: Set(activity_id),
            followup_date: Set(input.followup_date.unwrap_or_else(|| Utc::now().date_naive())),
            notes: Set(input.notes),
            comment: Set(input.comment),
            status_update: Set(input.status_update),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self, input), fields(project_id = input.project_id))]
    pub async fn add_report(&self, input: NewReport) -> Result<project_report::Model, ServiceError> {
        input.validate()?;
        if input.week_start > input.week_end {
            return Err(ServiceError::ValidationError(
                "Week start must not be after week end".into(),
            ));
        }
        self.find_project(input.project_id).await?;
        let now = Utc::now();
        Ok(project_report::ActiveModel {
            project_id: Set(input.project_id),
            week_start: Set(input.week_start),
            week_end: Set(input.week_end),
            summary: Set(input.summary),
            report_date: Set(input.report_date.unwrap_or_else(|| now.date_naive())),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_reports(&self, project_id: Option<i32>) -> Result<Vec<project_report::Model>, ServiceError> {
        let mut query = project_report::Entity::find();
        if let Some(id) = project_id {
            query = query.filter(project_report::Column::ProjectId.eq(id));
        }
        Ok(query
            .order_by_desc(project_report::Column::Id)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: i32, date: NaiveDate, status: &str) -> activity::Model {
        activity::Model {
            id,
            project_id: None,
            department_id: None,
            activity_name: format!("Activity {}", id),
            planned_date: date,
            intended_result: None,
            status: status.into(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn summary_clamps_months_to_range() {
        let acts = vec![
            activity(1, d(2024, 1, 30), "Achieved"),
            activity(2, d(2024, 2, 2), "In Progress"),
            activity(3, d(2024, 2, 3), "Postponed"),
        ];
        let months = monthly_summary(d(2024, 1, 29), d(2024, 2, 4), &acts);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].start, d(2024, 1, 29));
        assert_eq!(months[0].end, d(2024, 1, 31));
        assert_eq!(months[0].status_counts["Achieved"], 1);
        assert_eq!(months[1].start, d(2024, 2, 1));
        assert_eq!(months[1].end, d(2024, 2, 4));
        assert_eq!(months[1].activity_count, 2);
        assert_eq!(months[1].status_counts["Not Achieved"], 1);
        assert_eq!(months[1].status_counts["In Progress"], 1);
    }

    #[test]
    fn week_has_seven_days() {
        let start = d(2024, 12, 29);
        let days = days_between(start, start + Duration::days(6));
        assert_eq!(days.len(), 7);
        assert_eq!(days[6], d(2025, 1, 4));
    }
}
