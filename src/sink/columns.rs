use super::Cell;
use crate::config::ColumnConfig;
use crate::tracking::ClickEvent;

impl ColumnConfig {
    /// Cells for one click row, in sheet order.
    pub fn cells_for(&self, event: &ClickEvent) -> Vec<Cell> {
        vec![
            Cell::new(&self.sop, &event.sop_key),
            Cell::new(&self.sop_name, &event.sop_label),
            Cell::new(&self.target, &event.target_url),
            Cell::new(&self.user, &event.actor_id),
            Cell::new(&self.user_name, &event.actor_name),
            Cell::new(&self.date, &event.date),
            Cell::new(&self.time, &event.time),
        ]
    }
}
