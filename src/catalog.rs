//! Column catalogs for the administered entities.
//!
//! Each entity has one fixed, ordered list of column descriptors and a
//! primary-key field; [`Entity::table_spec`] packages both for the generic
//! table engine.

use std::fmt;
use std::str::FromStr;

use crate::table::{ColumnDescriptor, ColumnType, TableSpec};

/// An entity group served by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Entity {
    #[default]
    Clients,
    Samples,
    Users,
}

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::Clients, Entity::Samples, Entity::Users];

    /// REST path segment for this group.
    pub fn path(self) -> &'static str {
        match self {
            Entity::Clients => "clientes",
            Entity::Samples => "muestras",
            Entity::Users => "usuarios",
        }
    }

    /// Table id used for preference persistence.
    pub fn table_id(self) -> &'static str {
        match self {
            Entity::Clients => "clients",
            Entity::Samples => "samples",
            Entity::Users => "users",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Entity::Clients => "Clientes",
            Entity::Samples => "Muestras",
            Entity::Users => "Usuarios",
        }
    }

    /// Primary-key field of every record in this group.
    pub fn key_field(self) -> &'static str {
        "ID"
    }

    /// The next entity in navigation order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Entity::Clients => Entity::Samples,
            Entity::Samples => Entity::Users,
            Entity::Users => Entity::Clients,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Entity::Clients => Entity::Users,
            Entity::Samples => Entity::Clients,
            Entity::Users => Entity::Samples,
        }
    }

    /// Build the table configuration for this entity.
    pub fn table_spec(self) -> TableSpec {
        TableSpec {
            table_id: self.table_id(),
            key_field: self.key_field(),
            columns: self.columns(),
            reorderable: !matches!(self, Entity::Users),
        }
    }

    fn columns(self) -> Vec<ColumnDescriptor> {
        use ColumnType::*;
        match self {
            Entity::Clients => vec![
                ColumnDescriptor::new("ID", "ID", Number, 80).priority(2),
                ColumnDescriptor::new("CODIGO", "Código", String, 100).priority(2),
                ColumnDescriptor::new("NOMBRE", "Nombre", String, 280).priority(1),
                ColumnDescriptor::new("CIF", "CIF", String, 120),
                ColumnDescriptor::new("EMAIL", "Email", String, 240),
                ColumnDescriptor::new("TELEFONO", "Teléfono", String, 130),
                ColumnDescriptor::new("PROVINCIA", "Provincia", String, 150),
                ColumnDescriptor::new("PAIS", "País", String, 120).hidden(),
                ColumnDescriptor::new("FECHA_ALTA", "Fecha alta", Date, 120),
                ColumnDescriptor::new("ESTADO", "Estado", String, 120).hidden(),
                ColumnDescriptor::new("ANULADO", "Anulado", Boolean, 100).priority(2),
                ColumnDescriptor::new("OBSERVACIONES", "Observaciones", String, 300)
                    .hidden()
                    .unsortable(),
            ],
            Entity::Samples => vec![
                ColumnDescriptor::new("ID", "ID", Number, 80).priority(2),
                ColumnDescriptor::new("REFERENCIA", "Referencia", String, 140).priority(1),
                ColumnDescriptor::new("CLIENTE", "Cliente", String, 240).priority(1),
                ColumnDescriptor::new("ESTADO", "Estado", String, 120).priority(1),
                ColumnDescriptor::new("TIPO_MUESTRA", "Tipo", String, 160),
                ColumnDescriptor::new("FECHA_RECEPCION", "Recepción", Date, 120).priority(2),
                ColumnDescriptor::new("HORA_RECEPCION", "Hora", Time, 80).hidden(),
                ColumnDescriptor::new("PRECIO", "Precio", Number, 100).hidden(),
                ColumnDescriptor::new("ANULADO", "Anulado", Boolean, 100),
            ],
            Entity::Users => vec![
                ColumnDescriptor::new("ID", "ID", Number, 80).priority(2),
                ColumnDescriptor::new("USUARIO", "Usuario", String, 140).priority(1),
                ColumnDescriptor::new("NOMBRE", "Nombre", String, 220).priority(1),
                ColumnDescriptor::new("EMAIL", "Email", String, 240),
                ColumnDescriptor::new("ROL", "Rol", String, 120).priority(2),
                ColumnDescriptor::new("ULTIMO_ACCESO", "Último acceso", Date, 140),
                ColumnDescriptor::new("ACTIVO", "Activo", Boolean, 90).priority(2),
            ],
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_id())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clients" | "clientes" => Ok(Entity::Clients),
            "samples" | "muestras" => Ok(Entity::Samples),
            "users" | "usuarios" => Ok(Entity::Users),
            other => Err(format!(
                "unknown table '{}' (expected clients, samples or users)",
                other
            )),
        }
    }
}
