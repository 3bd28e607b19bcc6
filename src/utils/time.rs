//! Utilidades de fecha y hora
//!
//! Todas las marcas de tiempo se guardan en UTC. La única regla que toca la hora local
//! es la fecha de creación que se muestra al operador del taller.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// Zona horaria fija en la que se muestran las fechas a los operadores
#[derive(Debug, Clone, Copy)]
pub struct DisplayZone {
    offset: FixedOffset,
}

impl DisplayZone {
    /// Crea la zona a partir de un desplazamiento en minutos respecto de UTC
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Fecha local de hoy, usada para comparar vencimientos de obleas
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.to_local(now).date_naive()
    }

    pub fn format(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%d/%m/%Y %H:%M").to_string()
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        // Argentina, UTC-3
        Self {
            offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Instante a partir del cual un trámite condicional sin reinspección queda vencido
pub fn conditional_cutoff(now: DateTime<Utc>, grace_days: i64) -> DateTime<Utc> {
    now - Duration::days(grace_days)
}
