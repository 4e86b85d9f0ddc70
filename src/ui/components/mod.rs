//! Reusable UI components.

mod column_picker;
mod data_table;
mod loading;
mod notification;

pub use column_picker::{ColumnPicker, ColumnPickerAction};
pub use data_table::{
    column_area_units, render_data_table, ColumnSlot, TableGeometry, TableViewport,
    units_to_cells, WHEEL_STEP,
};
pub use loading::LoadingIndicator;
pub use notification::{Notification, NotificationManager, NotificationType};
