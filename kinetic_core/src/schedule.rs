//! Daily schedule: time-blocked tasks persisted under [`SCHEDULE_KEY`].

use crate::storage::{JsonList, KeyValueStore, SCHEDULE_KEY};
use crate::{Error, Result, Task, TaskCategory, TaskStatus};
use chrono::NaiveTime;
use uuid::Uuid;

const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Input for a new schedule entry
#[derive(Clone, Debug, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub duration_minutes: Option<u32>,
    pub category: Option<TaskCategory>,
    pub location: Option<String>,
    pub url: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, start_time: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_time: start_time.into(),
            ..Self::default()
        }
    }
}

/// Normalize "H:MM"/"HH:MM" to "HH:MM"
fn normalize_start_time(raw: &str) -> Result<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| Error::Validation(format!("start time {:?} is not HH:MM", raw)))
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..9].to_string()
}

fn seed_tasks() -> Vec<Task> {
    let task = |id: &str, title: &str, start: &str, minutes, category, status| Task {
        id: id.into(),
        title: title.into(),
        description: None,
        start_time: start.into(),
        duration_minutes: minutes,
        category,
        status,
        location: None,
        url: None,
    };
    vec![
        task("1", "Wake up & sunlight", "07:00", 30, TaskCategory::Health, TaskStatus::Completed),
        task("2", "Deep work block", "08:30", 120, TaskCategory::Work, TaskStatus::InProgress),
        task("3", "Lunch", "12:00", 45, TaskCategory::Health, TaskStatus::Todo),
    ]
}

pub struct ScheduleStore<S: KeyValueStore> {
    list: JsonList<Task, S>,
}

impl<S: KeyValueStore> ScheduleStore<S> {
    /// Load the schedule, seeding a starter day when none is stored
    pub fn open(store: S) -> Self {
        Self {
            list: JsonList::open_or_else(store, SCHEDULE_KEY, seed_tasks),
        }
    }

    /// Tasks ordered by start time
    pub fn list(&self) -> Vec<&Task> {
        let mut tasks: Vec<_> = self.list.items().iter().collect();
        tasks.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.list.items().iter().find(|t| t.id == id)
    }

    pub fn has_pending_write(&self) -> bool {
        self.list.has_pending_write()
    }

    pub fn into_inner(self) -> S {
        self.list.into_inner()
    }

    pub fn add(&mut self, new_task: NewTask) -> Result<Task> {
        let title = new_task.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("task title is empty".into()));
        }
        let start_time = normalize_start_time(&new_task.start_time)?;
        let duration_minutes = new_task.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes == 0 {
            return Err(Error::Validation("task duration must be positive".into()));
        }

        let task = Task {
            id: short_id(),
            title,
            description: new_task.description,
            start_time,
            duration_minutes,
            category: new_task.category.unwrap_or(TaskCategory::Personal),
            status: TaskStatus::Todo,
            location: new_task.location,
            url: new_task.url,
        };

        tracing::info!("Scheduled {} at {}", task.title, task.start_time);
        let added = task.clone();
        self.list.mutate(move |tasks| {
            tasks.push(task.clone());
            ((), true)
        });
        Ok(added)
    }

    /// Returns whether a task was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let target = id.to_string();
        self.list.mutate(move |tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != target);
            let removed = tasks.len() != before;
            (removed, removed)
        })
    }

    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> Result<()> {
        let target = id.to_string();
        let found = self.list.mutate(move |tasks| match tasks.iter_mut().find(|t| t.id == target) {
            Some(task) => {
                task.status = status;
                (true, true)
            }
            None => (false, false),
        });

        if !found {
            return Err(Error::not_found("task", id));
        }
        tracing::debug!("Task {} is now {}", id, status);
        Ok(())
    }

    /// Schedule rendered as `- HH:MM: Title (Category)` lines
    pub fn context_lines(&self) -> String {
        self.list()
            .iter()
            .map(|t| format!("- {}: {} ({})", t.start_time, t.title, t.category))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_seeds_when_empty() {
        let schedule = ScheduleStore::open(MemoryStore::new());
        let titles: Vec<_> = schedule.list().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Wake up & sunlight", "Deep work block", "Lunch"]);
    }

    #[test]
    fn test_seed_is_persisted_with_first_change() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        schedule.add(NewTask::new("Walk", "18:00")).unwrap();

        let reopened = ScheduleStore::open(schedule.into_inner());
        assert_eq!(reopened.list().len(), 4);
    }

    #[test]
    fn test_add_sorts_and_defaults() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        let task = schedule.add(NewTask::new("  Stretch ", "6:15")).unwrap();

        assert_eq!(task.title, "Stretch");
        assert_eq!(task.start_time, "06:15");
        assert_eq!(task.duration_minutes, 30);
        assert_eq!(task.category, TaskCategory::Personal);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(schedule.list()[0].id, task.id);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        assert!(matches!(
            schedule.add(NewTask::new("", "09:00")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            schedule.add(NewTask::new("Run", "25:00")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            schedule.add(NewTask::new("Run", "morning")),
            Err(Error::Validation(_))
        ));

        let mut zero = NewTask::new("Run", "09:00");
        zero.duration_minutes = Some(0);
        assert!(schedule.add(zero).is_err());
    }

    #[test]
    fn test_remove() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        assert!(schedule.remove("2"));
        assert!(!schedule.remove("2"));
        assert_eq!(schedule.list().len(), 2);
    }

    #[test]
    fn test_update_status() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        schedule.update_status("3", TaskStatus::Completed).unwrap();
        assert_eq!(schedule.get("3").unwrap().status, TaskStatus::Completed);

        let err = schedule.update_status("nope", TaskStatus::Skipped).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_context_lines() {
        let schedule = ScheduleStore::open(MemoryStore::new());
        let context = schedule.context_lines();
        assert_eq!(
            context,
            "- 07:00: Wake up & sunlight (Health)\n- 08:30: Deep work block (Work)\n- 12:00: Lunch (Health)"
        );
    }

    #[test]
    fn test_wire_format() {
        let mut schedule = ScheduleStore::open(MemoryStore::new());
        schedule.update_status("2", TaskStatus::Skipped).unwrap();

        let store = schedule.into_inner();
        let blob = store.get(SCHEDULE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value[1]["startTime"], "08:30");
        assert_eq!(value[1]["durationMinutes"], 120);
        assert_eq!(value[1]["status"], "skipped");
        assert_eq!(value[0]["status"], "completed");
        assert_eq!(value[0]["category"], "Health");
    }

    #[test]
    fn test_write_failure_keeps_task_in_memory() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        let mut schedule = ScheduleStore::open(store);
        // Unreadable storage starts empty rather than seeding
        assert!(schedule.list().is_empty());

        schedule.add(NewTask::new("Read", "21:00")).unwrap();
        assert_eq!(schedule.list().len(), 1);
        assert!(schedule.has_pending_write());
    }

    #[test]
    fn test_offline_changes_merge_onto_stored_day() {
        let mut store = MemoryStore::new();
        crate::storage::save_json(&mut store, SCHEDULE_KEY, &seed_tasks()).unwrap();
        store.set_unavailable(true);

        let mut schedule = ScheduleStore::open(store);
        schedule.add(NewTask::new("Read", "21:00")).unwrap();

        schedule.list.store_mut().set_unavailable(false);
        schedule.update_status("3", TaskStatus::Skipped).unwrap();
        assert!(!schedule.has_pending_write());

        let reopened = ScheduleStore::open(schedule.into_inner());
        let titles: Vec<_> = reopened.list().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Wake up & sunlight", "Deep work block", "Lunch", "Read"]);
        assert_eq!(reopened.get("3").unwrap().status, TaskStatus::Skipped);
    }
}
