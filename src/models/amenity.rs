//! Airport amenities (shops, restaurants, lounges).

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::Embedding;

/// Column names of the weekly opening hours, in storage order.
///
/// The order matches [`Amenity::weekly_hours`] and
/// [`Amenity::from_parts`].
pub const WEEKLY_HOUR_COLUMNS: [&str; 14] = [
    "sunday_start_hour",
    "sunday_end_hour",
    "monday_start_hour",
    "monday_end_hour",
    "tuesday_start_hour",
    "tuesday_end_hour",
    "wednesday_start_hour",
    "wednesday_end_hour",
    "thursday_start_hour",
    "thursday_end_hour",
    "friday_start_hour",
    "friday_end_hour",
    "saturday_start_hour",
    "saturday_end_hour",
];

/// An amenity located in an airport terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub terminal: String,
    pub category: String,
    /// Free-text opening hours as shown to travellers.
    pub hour: String,
    #[serde(default)]
    pub sunday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub sunday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub monday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub monday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub tuesday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub tuesday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub wednesday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub wednesday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub thursday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub thursday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub friday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub friday_end_hour: Option<NaiveTime>,
    #[serde(default)]
    pub saturday_start_hour: Option<NaiveTime>,
    #[serde(default)]
    pub saturday_end_hour: Option<NaiveTime>,
    /// Text the embedding was computed from.
    pub content: String,
    pub embedding: Embedding,
}

impl Amenity {
    /// Assembles an amenity from stored columns, hours in [`WEEKLY_HOUR_COLUMNS`] order.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: i64,
        name: String,
        description: String,
        location: String,
        terminal: String,
        category: String,
        hour: String,
        weekly_hours: [Option<NaiveTime>; 14],
        content: String,
        embedding: Embedding,
    ) -> Self {
        let [sun_s, sun_e, mon_s, mon_e, tue_s, tue_e, wed_s, wed_e, thu_s, thu_e, fri_s, fri_e, sat_s, sat_e] =
            weekly_hours;
        Self {
            id,
            name,
            description,
            location,
            terminal,
            category,
            hour,
            sunday_start_hour: sun_s,
            sunday_end_hour: sun_e,
            monday_start_hour: mon_s,
            monday_end_hour: mon_e,
            tuesday_start_hour: tue_s,
            tuesday_end_hour: tue_e,
            wednesday_start_hour: wed_s,
            wednesday_end_hour: wed_e,
            thursday_start_hour: thu_s,
            thursday_end_hour: thu_e,
            friday_start_hour: fri_s,
            friday_end_hour: fri_e,
            saturday_start_hour: sat_s,
            saturday_end_hour: sat_e,
            content,
            embedding,
        }
    }

    /// Returns the fourteen opening/closing times in [`WEEKLY_HOUR_COLUMNS`] order.
    pub fn weekly_hours(&self) -> [Option<NaiveTime>; 14] {
        [
            self.sunday_start_hour,
            self.sunday_end_hour,
            self.monday_start_hour,
            self.monday_end_hour,
            self.tuesday_start_hour,
            self.tuesday_end_hour,
            self.wednesday_start_hour,
            self.wednesday_end_hour,
            self.thursday_start_hour,
            self.thursday_end_hour,
            self.friday_start_hour,
            self.friday_end_hour,
            self.saturday_start_hour,
            self.saturday_end_hour,
        ]
    }
}
