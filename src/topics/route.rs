use super::{
    AIRQUALITY, ALT, DETAILS, ENERGY, GPS, LAT_LON, LIGHTS, STATUS, TEMP_HUMID, THERMOSTAT,
};

/// Which payload fields make it onto the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Only these keys, and only when present in the payload.
    Fields(&'static [&'static str]),
    /// The payload as received.
    Passthrough,
}

/// Whether the topic embeds an identifier the handler needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    None,
    /// Numeric id segment, copied into the data as `id` and `_id`.
    Numeric,
}

/// One inbound topic shape and where its payload goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub domain: &'static str,
    pub message_type: &'static str,
    /// Broadcast channel (`type` on the envelope).
    pub channel: &'static str,
    pub id: IdSource,
    pub projection: Projection,
}

pub static ROUTES: &[Route] = &[
    Route {
        domain: LIGHTS,
        message_type: STATUS,
        channel: "light",
        id: IdSource::Numeric,
        projection: Projection::Fields(&["state", "brightness"]),
    },
    Route {
        domain: THERMOSTAT,
        message_type: STATUS,
        channel: "thermostat",
        id: IdSource::None,
        projection: Projection::Fields(&["target_temp", "mode"]),
    },
    Route {
        domain: ENERGY,
        message_type: STATUS,
        channel: "energy",
        id: IdSource::None,
        projection: Projection::Fields(&[
            "solar_watts",
            "battery_percent",
            "battery_voltage",
            "charge_type",
            "time_remaining_minutes",
        ]),
    },
    Route {
        domain: AIRQUALITY,
        message_type: STATUS,
        channel: "airquality",
        id: IdSource::None,
        projection: Projection::Fields(&["iaq_index", "co2_ppm"]),
    },
    Route {
        domain: AIRQUALITY,
        message_type: TEMP_HUMID,
        channel: "temphumid",
        id: IdSource::None,
        projection: Projection::Passthrough,
    },
    Route {
        domain: GPS,
        message_type: LAT_LON,
        channel: "latlon",
        id: IdSource::None,
        projection: Projection::Fields(&["latitude", "longitude"]),
    },
    Route {
        domain: GPS,
        message_type: ALT,
        channel: "alt",
        id: IdSource::None,
        projection: Projection::Fields(&["altitudeInMeters", "altitudeFeet"]),
    },
    Route {
        domain: GPS,
        message_type: DETAILS,
        channel: "gnss_details",
        id: IdSource::None,
        projection: Projection::Fields(&[
            "numberOfSatellites",
            "speedOverGround",
            "courseOverGround",
            "gnssMode",
        ]),
    },
];

pub fn find_route(domain: &str, message_type: &str) -> Option<&'static Route> {
    ROUTES
        .iter()
        .find(|r| r.domain == domain && r.message_type == message_type)
}
