mod helpers;
mod meal;
mod offline;
mod template;
mod week;

pub(crate) use meal::{cmd_day, cmd_delete, cmd_edit, cmd_log};
pub(crate) use offline::{cmd_offline_activate, cmd_offline_fetch, cmd_offline_install, cmd_offline_list};
pub(crate) use template::{cmd_template_add, cmd_template_list};
pub(crate) use week::cmd_week;
