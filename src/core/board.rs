use chrono::NaiveDate;

use crate::models::{Priority, Status, Task, TaskId};

/// What a card on the board shows. Overdue is derived here and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub status: Status,
    pub overdue: bool,
    pub comment_count: usize,
    pub has_image: bool,
}

impl CardView {
    fn from_task(task: &Task, today: NaiveDate) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            status: task.status,
            overdue: task.is_overdue(today),
            comment_count: task.comments.len(),
            has_image: task.image.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub status: Status,
    pub cards: Vec<CardView>,
}

impl ColumnView {
    pub fn count(&self) -> usize {
        self.cards.len()
    }
}

/// The three columns of the board, projected from the task collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub today: NaiveDate,
    pub columns: [ColumnView; 3],
}

impl BoardView {
    /// Partition `tasks` by status, keeping collection order inside each column.
    pub fn project(tasks: &[Task], today: NaiveDate) -> Self {
        let mut columns = Status::ALL.map(|status| ColumnView {
            status,
            cards: Vec::new(),
        });

        for task in tasks {
            columns[task.status.column_index()]
                .cards
                .push(CardView::from_task(task, today));
        }

        Self { today, columns }
    }

    pub fn column(&self, status: Status) -> &ColumnView {
        &self.columns[status.column_index()]
    }

    pub fn count(&self, status: Status) -> usize {
        self.column(status).count()
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(ColumnView::count).sum()
    }

    #[cfg(test)]
    pub fn find(&self, id: TaskId) -> Option<&CardView> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|card| card.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, TaskDraft};
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn task(id: TaskId, status: Status, due: NaiveDate) -> Task {
        let fields = TaskDraft {
            title: format!("task {}", id),
            description: String::new(),
            priority: Some(Priority::Medium),
            due_date: Some(due),
            image: None,
        }
        .validate()
        .unwrap();
        let mut task = Task::new(id, fields);
        task.status = status;
        task
    }

    #[test]
    fn test_partition_is_complete_and_ordered() {
        let tasks = vec![
            task(1, Status::Done, today()),
            task(2, Status::Todo, today()),
            task(3, Status::InProgress, today()),
            task(4, Status::Todo, today()),
            task(5, Status::Done, today()),
        ];

        let board = BoardView::project(&tasks, today());

        assert_eq!(board.total(), tasks.len());
        let mut seen: Vec<TaskId> = board
            .columns
            .iter()
            .flat_map(|c| c.cards.iter().map(|card| card.id))
            .collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        let todo: Vec<_> = board.column(Status::Todo).cards.iter().map(|c| c.id).collect();
        assert_eq!(todo, vec![2, 4]);
        let done: Vec<_> = board.column(Status::Done).cards.iter().map(|c| c.id).collect();
        assert_eq!(done, vec![1, 5]);
        assert_eq!(board.count(Status::InProgress), 1);
    }

    #[test]
    fn test_overdue_flags() {
        let yesterday = today().pred_opt().unwrap();
        let tasks = vec![
            task(1, Status::Todo, yesterday),
            task(2, Status::Done, yesterday),
            task(3, Status::Todo, today()),
        ];

        let board = BoardView::project(&tasks, today());

        assert!(board.find(1).unwrap().overdue);
        assert!(!board.find(2).unwrap().overdue);
        assert!(!board.find(3).unwrap().overdue);
    }

    #[test]
    fn test_badges() {
        let mut t = task(1, Status::Todo, today());
        t.image = Some("data:image/jpeg;base64,AAAA".to_string());
        t.comments.push(Comment {
            id: 1,
            text: "draft ready".to_string(),
            timestamp: Utc::now(),
        });

        let board = BoardView::project(&[t], today());
        let card = board.find(1).unwrap();
        assert_eq!(card.comment_count, 1);
        assert!(card.has_image);
    }

    #[test]
    fn test_empty_board() {
        let board = BoardView::project(&[], today());
        assert_eq!(board.total(), 0);
        for status in Status::ALL {
            assert_eq!(board.count(status), 0);
            assert_eq!(board.column(status).status, status);
        }
    }
}
