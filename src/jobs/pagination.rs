//! # Paginación por Cursor
//! src/jobs/pagination.rs
//!
//! Implementa el token de cursor opaco del listado de jobs. El token
//! codifica la posición `(created_at, id)` del último elemento visto y
//! la dirección de navegación, en base64 url-safe. A diferencia de un
//! offset numérico, la posición es estable ante inserts concurrentes:
//! un job nuevo nunca desplaza los resultados de una página ya pedida.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Posición de paginación decodificada de un token de cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// `created_at` (microsegundos) del elemento de referencia
    pub ts: i64,

    /// `id` del elemento de referencia (desempate de timestamps iguales)
    pub id: i64,

    /// `false` = avanzar hacia jobs más viejos (next),
    /// `true` = retroceder hacia jobs más nuevos (previous)
    pub reverse: bool,
}

impl Cursor {
    /// Cursor "next" apuntando al último elemento de la página actual
    pub fn next_after(ts: i64, id: i64) -> Self {
        Self {
            ts,
            id,
            reverse: false,
        }
    }

    /// Cursor "previous" apuntando al primer elemento de la página actual
    pub fn previous_before(ts: i64, id: i64) -> Self {
        Self {
            ts,
            id,
            reverse: true,
        }
    }

    /// Codifica el cursor como token opaco url-safe
    ///
    /// # Ejemplo
    /// ```
    /// use joblister::jobs::pagination::Cursor;
    ///
    /// let cursor = Cursor::next_after(1700000000000000, 42);
    /// let token = cursor.encode();
    /// assert_eq!(Cursor::decode(&token), Some(cursor));
    /// ```
    pub fn encode(&self) -> String {
        let direction = if self.reverse { "p" } else { "n" };
        let raw = format!("{}:{}:{}", self.ts, self.id, direction);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decodifica un token de cursor
    ///
    /// Retorna `None` ante cualquier token que no haya producido este
    /// servidor (base64 inválido, formato incorrecto, números ilegibles).
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
        let raw = String::from_utf8(bytes).ok()?;

        let mut parts = raw.split(':');
        let ts: i64 = parts.next()?.parse().ok()?;
        let id: i64 = parts.next()?.parse().ok()?;
        let reverse = match parts.next()? {
            "n" => false,
            "p" => true,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self { ts, id, reverse })
    }
}

/// Construye la URL relativa de una página del listado
pub fn page_url(cursor: &Cursor, page_size: usize) -> String {
    format!(
        "/api/jobs/?cursor={}&page_size={}",
        cursor.encode(),
        page_size
    )
}
