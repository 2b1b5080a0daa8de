//! Back-office list screen configuration for every registered entity.
//!
//! Each entry names the columns a changelist shows, the fields it can be
//! filtered and searched on, and its default ordering (a `-` prefix sorts
//! descending). Only user, guardian and student are stored in the
//! workspace; the rest are served as metadata.

pub mod changelist;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Column {
    pub field: &'static str,
    pub label: &'static str,
}

const fn col(field: &'static str, label: &'static str) -> Column {
    Column { field, label }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAdmin {
    pub key: &'static str,
    pub verbose_name: &'static str,
    pub list_display: &'static [Column],
    pub list_display_links: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub ordering: &'static [&'static str],
    pub date_hierarchy: Option<&'static str>,
    pub readonly_fields: &'static [&'static str],
    pub filter_horizontal: &'static [&'static str],
    pub view_on_site: bool,
    pub import_export: bool,
    /// Import adapter wired to the model's bulk import, if any.
    pub resource: Option<&'static str>,
}

const EMPTY: ModelAdmin = ModelAdmin {
    key: "",
    verbose_name: "",
    list_display: &[],
    list_display_links: &[],
    list_filter: &[],
    search_fields: &[],
    ordering: &[],
    date_hierarchy: None,
    readonly_fields: &[],
    filter_horizontal: &[],
    view_on_site: false,
    import_export: true,
    resource: None,
};

static REGISTRY: &[ModelAdmin] = &[
    ModelAdmin {
        key: "user",
        verbose_name: "User",
        list_display: &[
            col("email", "Email"),
            col("first_name", "First Name"),
            col("last_name", "Last Name"),
            col("role", "Role"),
            col("date_joined", "Date Joined"),
            col("last_login", "Last Login"),
            col("is_active", "Active"),
            col("is_staff", "Staff"),
            col("is_superuser", "Superuser"),
        ],
        list_filter: &["role", "is_active", "is_staff", "date_joined"],
        search_fields: &["first_name", "last_name", "email"],
        ordering: &["-date_joined"],
        date_hierarchy: Some("date_joined"),
        readonly_fields: &["password", "last_login"],
        filter_horizontal: &["groups", "user_permissions"],
        ..EMPTY
    },
    ModelAdmin {
        key: "mentor",
        verbose_name: "Mentor",
        list_display: &[
            col("user", "User"),
            col("get_first_name", "First Name"),
            col("get_last_name", "Last Name"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
            col("active", "Active"),
            col("public", "Public"),
            col("background_check", "Background Check"),
            col("avatar_approved", "Avatar Approved"),
        ],
        list_filter: &["active", "public", "background_check", "avatar_approved"],
        search_fields: &[
            "user__first_name",
            "user__last_name",
            "user__username",
            "user__email",
        ],
        ordering: &["-created_at"],
        date_hierarchy: Some("created_at"),
        view_on_site: true,
        ..EMPTY
    },
    ModelAdmin {
        key: "guardian",
        verbose_name: "Guardian",
        list_display: &[
            col("get_first_name", "First Name"),
            col("get_last_name", "Last Name"),
            col("get_student_count", "# of Students"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
        ],
        list_filter: &["zip"],
        search_fields: &["user__first_name", "user__last_name", "user__username"],
        ordering: &["-created_at"],
        date_hierarchy: Some("created_at"),
        resource: Some("guardian"),
        ..EMPTY
    },
    ModelAdmin {
        key: "student",
        verbose_name: "Student",
        list_display: &[
            col("first_name", "First Name"),
            col("last_name", "Last Name"),
            col("gender", "Gender"),
            col("guardian", "Guardian"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
            col("active", "Active"),
        ],
        list_filter: &["gender"],
        search_fields: &[
            "first_name",
            "last_name",
            "guardian__user__first_name",
            "guardian__user__last_name",
        ],
        ordering: &["guardian"],
        date_hierarchy: Some("created_at"),
        filter_horizontal: &["race_ethnicity"],
        resource: Some("student"),
        ..EMPTY
    },
    ModelAdmin {
        key: "course",
        verbose_name: "Course",
        list_display: &[
            col("code", "Code"),
            col("title", "Title"),
            col("slug", "Slug"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
        ],
        list_filter: &["code"],
        ordering: &["created_at"],
        ..EMPTY
    },
    ModelAdmin {
        key: "session",
        verbose_name: "Session",
        list_display: &[
            col("course", "Course"),
            col("start_date", "Start Date"),
            col("end_date", "End Date"),
            col("location", "Location"),
            col("capacity", "Capacity"),
            col("get_current_orders_count", "Students"),
            col("get_mentor_count", "Mentors"),
            col("active", "Active"),
            col("public", "Public"),
            col("announced_date", "Announced"),
        ],
        list_filter: &["active", "public", "course__title", "location"],
        ordering: &["-start_date"],
        date_hierarchy: Some("start_date"),
        filter_horizontal: &["waitlist_mentors", "waitlist_students"],
        view_on_site: true,
        ..EMPTY
    },
    ModelAdmin {
        key: "order",
        verbose_name: "Order",
        list_display: &[
            col("student", "Student"),
            col("guardian", "Guardian"),
            col("alternate_guardian", "Alternate Guardian"),
            col("session", "Session"),
            col("check_in", "Check In"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
            col("active", "Active"),
            col("week_reminder_sent", "Week Reminder Sent"),
            col("day_reminder_sent", "Day Reminder Sent"),
        ],
        list_filter: &["active", "check_in", "student", "session"],
        ordering: &["created_at"],
        date_hierarchy: Some("created_at"),
        ..EMPTY
    },
    ModelAdmin {
        key: "mentor_order",
        verbose_name: "Mentor Order",
        list_display: &[
            col("mentor", "Mentor"),
            col("session", "Session"),
            col("ip", "IP"),
            col("check_in", "Check In"),
            col("active", "Active"),
            col("week_reminder_sent", "Week Reminder Sent"),
            col("day_reminder_sent", "Day Reminder Sent"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
        ],
        list_display_links: &["mentor"],
        list_filter: &["active", "check_in", "session"],
        search_fields: &["mentor__user__first_name", "mentor__user__last_name"],
        ordering: &["created_at"],
        date_hierarchy: Some("created_at"),
        readonly_fields: &["ip"],
        ..EMPTY
    },
    ModelAdmin {
        key: "meeting_order",
        verbose_name: "Meeting Order",
        list_display: &[
            col("mentor", "Mentor"),
            col("meeting", "Meeting"),
            col("ip", "IP"),
            col("check_in", "Check In"),
            col("active", "Active"),
            col("week_reminder_sent", "Week Reminder Sent"),
            col("day_reminder_sent", "Day Reminder Sent"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
        ],
        list_filter: &["active", "meeting", "check_in", "meeting__meeting_type"],
        search_fields: &["mentor__user__first_name", "mentor__user__last_name"],
        ordering: &["created_at"],
        date_hierarchy: Some("created_at"),
        ..EMPTY
    },
    ModelAdmin {
        key: "meeting_type",
        verbose_name: "Meeting Type",
        list_display: &[
            col("code", "Code"),
            col("title", "Title"),
            col("slug", "Slug"),
        ],
        list_display_links: &["title"],
        ..EMPTY
    },
    ModelAdmin {
        key: "meeting",
        verbose_name: "Meeting",
        list_display: &[
            col("meeting_type", "Meeting Type"),
            col("start_date", "Start Date"),
            col("end_date", "End Date"),
            col("location", "Location"),
            col("get_mentor_count", "Mentors"),
            col("public", "Public"),
            col("announced_date", "Announced"),
            col("created_at", "Created"),
        ],
        list_filter: &["active", "public", "location", "meeting_type__title"],
        ordering: &["-start_date"],
        date_hierarchy: Some("start_date"),
        view_on_site: true,
        ..EMPTY
    },
    ModelAdmin {
        key: "equipment_type",
        verbose_name: "Equipment Type",
        ..EMPTY
    },
    ModelAdmin {
        key: "equipment",
        verbose_name: "Equipment",
        list_display: &[
            col("uuid", "UUID"),
            col("asset_tag", "Asset Tag"),
            col("equipment_type", "Equipment Type"),
            col("make", "Make"),
            col("model", "Model"),
            col("condition", "Condition"),
            col("last_system_update_check_in", "Last Update Check In"),
            col("last_system_update", "Last System Update"),
            col("force_update_on_next_boot", "Force Update On Next Boot"),
        ],
        list_filter: &["condition", "equipment_type", "make", "model"],
        search_fields: &["uuid", "make", "model", "asset_tag"],
        ordering: &["uuid"],
        readonly_fields: &["last_system_update_check_in", "last_system_update"],
        ..EMPTY
    },
    ModelAdmin {
        key: "donation",
        verbose_name: "Donation",
        list_display: &[
            col("first_name", "First Name"),
            col("last_name", "Last Name"),
            col("email", "Email"),
            col("amount", "Amount"),
            col("verified", "Verified"),
            col("receipt_sent", "Receipt Sent"),
            col("created_at", "Created"),
            col("updated_at", "Updated"),
        ],
        list_filter: &["verified", "receipt_sent", "amount", "created_at"],
        search_fields: &["first_name", "last_name", "email"],
        ordering: &["-created_at"],
        date_hierarchy: Some("created_at"),
        ..EMPTY
    },
    ModelAdmin {
        key: "location",
        verbose_name: "Location",
        ..EMPTY
    },
    ModelAdmin {
        key: "race_ethnicity",
        verbose_name: "Race/Ethnicity",
        view_on_site: true,
        ..EMPTY
    },
];

pub fn registry() -> &'static [ModelAdmin] {
    REGISTRY
}

pub fn lookup(key: &str) -> Option<&'static ModelAdmin> {
    REGISTRY.iter().find(|m| m.key == key)
}

impl ModelAdmin {
    pub fn displays(&self, field: &str) -> bool {
        self.list_display.iter().any(|c| c.field == field)
    }

    /// Fields a changelist may sort by: displayed columns plus the default ordering.
    pub fn sortable(&self, field: &str) -> bool {
        self.displays(field)
            || self
                .ordering
                .iter()
                .any(|o| o.trim_start_matches('-') == field)
    }
}
