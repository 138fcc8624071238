use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

pub const DEMO_EMAIL: &str = "admin@demo.pj";
pub const DEMO_PASSWORD: &str = "demo123";

const MONTHS: [&str; 12] = [
    "ENE", "FEB", "MAR", "ABR", "MAY", "JUN", "JUL", "AGO", "SET", "OCT", "NOV", "DIC",
];

const FIRST_NAMES: &[&str] = &[
    "Ana", "Beto", "Carmen", "Diego", "Elena", "Fabio", "Gloria", "Hugo", "Irene", "Jorge",
    "Karina", "Luis", "Marta", "Nestor", "Olga", "Pablo", "Rosa", "Sergio",
];
const SURNAMES: &[&str] = &[
    "Ruiz", "Paz", "Quispe", "Flores", "Huaman", "Rojas", "Torres", "Vargas", "Mendoza",
    "Castillo", "Chavez", "Ramos", "Salazar", "Gutierrez",
];
const MODULES: &[(&str, &str)] = &[
    ("MODULO CIVIL", "JUZGADO CIVIL"),
    ("MODULO FAMILIA", "JUZGADO DE FAMILIA"),
    ("MODULO PENAL", "JUZGADO PENAL UNIPERSONAL"),
    ("MODULO LABORAL", "JUZGADO DE TRABAJO"),
    ("MODULO PAZ LETRADO", "JUZGADO DE PAZ LETRADO"),
];
const JURISDICTIONS: &[&str] = &["LIMA NORTE", "LIMA ESTE", "CALLAO"];

#[derive(Debug, Clone)]
struct DemoUser {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
    is_active: bool,
}

impl DemoUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "isActive": self.is_active,
        })
    }
}

#[derive(Debug)]
struct DemoState {
    users: Vec<DemoUser>,
    access_tokens: HashSet<String>,
    refresh_tokens: BTreeMap<String, i64>,
    solicitudes: Vec<Value>,
    next_token: u64,
    next_solicitud: i64,
    requests: usize,
}

/// In-process backend with the same routes and response shapes as the real API.
pub struct DemoBackend {
    state: Mutex<DemoState>,
    seed: u64,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new(26)
    }
}

impl DemoBackend {
    pub fn new(seed: u64) -> Self {
        let admin = DemoUser {
            id: 1,
            name: "Administrador Demo".to_string(),
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
            role: "admin".to_string(),
            is_active: true,
        };
        let operator = DemoUser {
            id: 2,
            name: "Operador Demo".to_string(),
            email: "operador@demo.pj".to_string(),
            password: DEMO_PASSWORD.to_string(),
            role: "user".to_string(),
            is_active: true,
        };
        Self {
            state: Mutex::new(DemoState {
                users: vec![admin, operator],
                access_tokens: HashSet::new(),
                refresh_tokens: BTreeMap::new(),
                solicitudes: Vec::new(),
                next_token: 1,
                next_solicitud: 1,
                requests: 0,
            }),
            seed,
        }
    }

    /// Invalidates every issued access token; refresh tokens stay valid.
    pub fn expire_access_tokens(&self) {
        self.lock().access_tokens.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    pub fn solicitudes(&self) -> Vec<Value> {
        self.lock().solicitudes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn route(&self, req: &HttpRequest) -> HttpResponse {
        let mut state = self.lock();
        state.requests += 1;
        let path = req.path.trim_end_matches('/');
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let body = req.body.clone().unwrap_or(Value::Null);

        match (req.method, segments.as_slice()) {
            (Method::Post, ["auth", "login"]) => login(&mut state, &body),
            (Method::Post, ["auth", "register"]) => register(&mut state, &body),
            (Method::Post, ["auth", "refresh"]) => refresh(&mut state, &body),
            (Method::Post, ["auth", "forgot-password"]) => {
                ok_enveloped(Value::Null, "Si el correo existe, se enviaron instrucciones")
            }
            (Method::Post, ["auth", "reset-password"]) => {
                bad_request("Token inválido o expirado")
            }
            (Method::Get, ["auth", "verify-reset-token", _]) => {
                ok_enveloped(json!({ "valid": false }), "Token verificado")
            }
            _ => {
                let Some(user_id) = authorize(&state, req) else {
                    return unauthorized("Unauthorized");
                };
                self.protected(&mut state, user_id, req.method, &segments, req, body)
            }
        }
    }

    fn protected(
        &self,
        state: &mut DemoState,
        user_id: i64,
        method: Method,
        segments: &[&str],
        req: &HttpRequest,
        body: Value,
    ) -> HttpResponse {
        match (method, segments) {
            (Method::Post, ["auth", "logout"]) => {
                state.refresh_tokens.retain(|_, owner| *owner != user_id);
                if let Some(token) = req.bearer.as_deref() {
                    state.access_tokens.remove(token);
                }
                ok_enveloped(Value::Null, "Sesión cerrada exitosamente")
            }
            (Method::Post, ["auth", "change-password"]) => change_password(state, user_id, &body),
            (Method::Get, ["estadistica", "cuadro-anual"]) => {
                let year = req.query_value("year").and_then(|v| v.parse().ok());
                let month = req.query_value("month").and_then(|v| v.parse().ok());
                match (year, month) {
                    (Some(year), Some(month)) if (1..=12).contains(&month) => {
                        ok_enveloped(self.cuadro(year, month), "Cuadro anual obtenido")
                    }
                    _ => bad_request("year y month son requeridos"),
                }
            }
            (Method::Get, ["estadistica", "cuadro-anual", "actual"]) => {
                let (year, month) = current_period();
                ok_enveloped(self.cuadro(year, month), "Cuadro anual obtenido")
            }
            (Method::Get, ["estadistica", "cuadro-anual", year]) => match year.parse::<i32>() {
                Ok(year) => ok_enveloped(self.cuadro(year, 12), "Cuadro anual obtenido"),
                Err(_) => bad_request("Año inválido"),
            },
            // The judge endpoints answer with a bare array on purpose.
            (Method::Get, ["jueces", "con-meta-resumenes", year, month]) => {
                match (year.parse::<i32>(), month.parse::<u32>()) {
                    (Ok(year), Ok(month)) if (1..=12).contains(&month) => {
                        ok_raw(Value::Array(self.judges(year, month)))
                    }
                    _ => bad_request("Periodo inválido"),
                }
            }
            (Method::Get, ["jueces", "activos"]) => {
                let (year, month) = current_period();
                ok_raw(Value::Array(self.judges(year, month)))
            }
            (Method::Get, ["jueces", "tipo", tipo]) => {
                let (year, month) = current_period();
                let judges = self
                    .judges(year, month)
                    .into_iter()
                    .filter(|j| j["n_juez_tipo_id"].to_string() == *tipo)
                    .collect();
                ok_raw(Value::Array(judges))
            }
            (Method::Get, ["jueces", "usuario", usuario]) => {
                let (year, month) = current_period();
                match self
                    .judges(year, month)
                    .into_iter()
                    .find(|j| j["usuario_id"].as_str() == Some(*usuario))
                {
                    Some(judge) => ok_raw(judge),
                    None => not_found("Juez no encontrado"),
                }
            }
            (Method::Get, ["jueces", "completos" | "meta-resumenes"]) => {
                let (year, month) = current_period();
                ok_raw(Value::Array(self.judges(year, month)))
            }
            (Method::Get, ["jueces", id, "meta-resumenes"]) => {
                let (year, month) = current_period();
                let Ok(id) = id.parse::<i64>() else {
                    return bad_request("Id de juez inválido");
                };
                match self
                    .judges(year, month)
                    .into_iter()
                    .find(|j| j["n_id_juez"].as_i64() == Some(id))
                {
                    Some(judge) => ok_raw(judge),
                    None => not_found("Juez no encontrado"),
                }
            }
            (Method::Get, ["jueces", "meta-resumen", year, month, instancia]) => {
                match (year.parse::<i32>(), month.parse::<u32>(), instancia.parse::<i64>()) {
                    (Ok(year), Ok(month), Ok(instancia)) if (1..=12).contains(&month) => {
                        let judges = self
                            .judges(year, month)
                            .into_iter()
                            .filter(|j| j["n_instancia_id"].as_i64() == Some(instancia))
                            .collect();
                        ok_raw(Value::Array(judges))
                    }
                    _ => bad_request("Periodo inválido"),
                }
            }
            (Method::Post, ["solicitudes"]) => create_solicitud(state, body),
            (Method::Get, ["solicitudes"]) => ok_raw(Value::Array(state.solicitudes.clone())),
            (Method::Get, ["solicitudes", "estadisticas"]) => {
                let mut por_estado: BTreeMap<String, i64> = BTreeMap::new();
                for s in &state.solicitudes {
                    let estado = s["estado"].as_str().unwrap_or("PENDIENTE").to_string();
                    *por_estado.entry(estado).or_default() += 1;
                }
                ok_enveloped(
                    json!({ "total": state.solicitudes.len(), "porEstado": por_estado }),
                    "Estadísticas obtenidas",
                )
            }
            (_, ["users", ..]) => users_route(state, user_id, method, segments, req, body),
            _ => not_found(&format!("Cannot {} {}", method.as_str(), req.path)),
        }
    }

    /// Deterministic per period, so refetching the same month shows the same table.
    fn cuadro(&self, year: i32, month: u32) -> Value {
        let mut rng = StdRng::seed_from_u64(self.seed ^ ((year as u64) << 8) ^ month as u64);
        let mut filas = Vec::new();
        let mut judge_id = 100;
        for (jur_idx, jurisdiction) in JURISDICTIONS.iter().enumerate() {
            for (mod_idx, (modulo, juzgado)) in MODULES.iter().enumerate() {
                let instancia = format!("{}° {} - {}", mod_idx + 1, juzgado, jurisdiction);
                let judge_count = rng.gen_range(1..=2);
                let mut jueces = Vec::new();
                for slot in 0..judge_count {
                    judge_id += 1;
                    jueces.push(demo_judge(judge_id, jur_idx * 7 + mod_idx * 3 + slot, &mut rng));
                }
                let names = jueces
                    .iter()
                    .filter_map(|j| j["nombre_completo"].as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let meta = rng.gen_range(600..1400) as f64;
                let niv_bueno = 80.0;
                let niv_muy_bueno = 100.0;
                let ideal = (month as f64 / 12.0 * 100.0 * 100.0).round() / 100.0;
                let real = (ideal * rng.gen_range(0.55..1.25) * 100.0).round() / 100.0;
                let res_total = (meta * real / 100.0).round() as i64;
                let mut res_cells = Vec::new();
                let mut ing_cells = Vec::new();
                let mut remaining = res_total;
                for m in 1..=month {
                    let val = if m == month {
                        remaining
                    } else {
                        let share = res_total / month as i64;
                        let jitter = rng.gen_range(-share / 4..=share / 4 + 1);
                        (share + jitter).clamp(0, remaining)
                    };
                    remaining -= val;
                    let cls = cell_class(val, meta / 12.0);
                    res_cells.push(json!({ "val": val, "nivel": "", "cls": cls }));
                    let ing = rng.gen_range(40..140);
                    ing_cells.push(json!({ "val": ing, "nivel": "", "cls": "" }));
                }
                let ing_total: i64 = ing_cells.iter().filter_map(|c| c["val"].as_i64()).sum();
                let pct_of_ideal = if ideal > 0.0 { real / ideal * 100.0 } else { 0.0 };
                filas.push(json!({
                    "org_jurisd": jurisdiction,
                    "instancia": instancia,
                    "jueces": names,
                    "jueces_objetos": jueces,
                    "res_total": res_total,
                    "ing_total": ing_total,
                    "meta_preliminar": meta,
                    "estandar": (meta / 12.0).round(),
                    "carga_inicial": rng.gen_range(200..900),
                    "pct_real_avance": real,
                    "pct_ideal_avance": ideal,
                    "nivel_prod": level_for(pct_of_ideal, niv_bueno, niv_muy_bueno),
                    "niv_bueno": niv_bueno,
                    "niv_muy_bueno": niv_muy_bueno,
                    "modulo_nom": modulo,
                    "res_cells": res_cells,
                    "ing_cells": ing_cells,
                }));
            }
        }
        json!({
            "fecha_consulta": Utc::now().to_rfc3339(),
            "mes_actual": month,
            "meses": MONTHS.iter().take(month as usize).collect::<Vec<_>>(),
            "filas": filas,
        })
    }

    fn judges(&self, year: i32, month: u32) -> Vec<Value> {
        let cuadro = self.cuadro(year, month);
        let mut out = Vec::new();
        let Some(filas) = cuadro["filas"].as_array() else {
            return out;
        };
        for (row_idx, fila) in filas.iter().enumerate() {
            let Some(jueces) = fila["jueces_objetos"].as_array() else {
                continue;
            };
            for judge in jueces {
                let full = judge["nombre_completo"].as_str().unwrap_or_default();
                let mut parts = full.split_whitespace();
                let nombres = parts.next().unwrap_or_default();
                let paterno = parts.next().unwrap_or_default();
                let materno = parts.next().unwrap_or_default();
                let id = judge["id"].as_i64().unwrap_or_default();
                // Every fourth row has no goal loaded yet.
                let has_goal = row_idx % 4 != 3;
                out.push(json!({
                    "n_id_juez": id,
                    "l_activo": "S",
                    "usuario_id": format!("U{id}"),
                    "n_juez_tipo_id": 1 + (row_idx % 2),
                    "x_juez_tipo_descripcion": if row_idx % 2 == 0 { "TITULAR" } else { "SUPERNUMERARIO" },
                    "x_nombres": nombres,
                    "x_app_paterno": paterno,
                    "x_app_materno": materno,
                    "x_dni": format!("4{:07}", id * 7919 % 10_000_000),
                    "x_telefono": judge["telefono"],
                    "email": format!("{}.{}@pj.gob.pe", nombres.to_lowercase(), paterno.to_lowercase()),
                    "username": format!("{}{}", nombres.chars().next().unwrap_or('x').to_lowercase(), paterno.to_lowercase()),
                    "l_mensaje": if judge["l_mensaje"].as_bool().unwrap_or(false) { 1 } else { 0 },
                    "x_sexo_descripcion": judge["sexo"],
                    "n_instancia_id": row_idx as i64 + 1,
                    "x_nom_instancia": fila["instancia"],
                    "m_niv_bueno": fila["niv_bueno"],
                    "m_niv_muy_bueno": fila["niv_muy_bueno"],
                    "m_avan_meta": if has_goal { format!("{:.2}", fila["pct_real_avance"].as_f64().unwrap_or(0.0)) } else { String::new() },
                    "x_niv_produc": if has_goal { fila["nivel_prod"].clone() } else { Value::Null },
                    "m_meta_preliminar": if has_goal { fila["meta_preliminar"].clone() } else { json!(0) },
                    "m_t_resuelto": if has_goal { fila["res_total"].clone() } else { json!(0) },
                    "n_anio_est": year,
                    "n_mes_est": month,
                    "tiene_meta_resumen": has_goal,
                }));
            }
        }
        out
    }
}

impl Transport for DemoBackend {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let resp = self.route(request);
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            status = resp.status,
            "demo backend"
        );
        Ok(resp)
    }
}

fn demo_judge(id: i64, slot: usize, rng: &mut StdRng) -> Value {
    let first = FIRST_NAMES[(id as usize + slot) % FIRST_NAMES.len()];
    let paterno = SURNAMES[(id as usize * 3 + slot) % SURNAMES.len()];
    let materno = SURNAMES[(id as usize * 5 + slot + 1) % SURNAMES.len()];
    let female = matches!(first.chars().last(), Some('a'));
    json!({
        "id": id,
        "nombre_completo": format!("{first} {paterno} {materno}"),
        "telefono": format!("9{:08}", rng.gen_range(10_000_000..99_999_999)),
        "l_mensaje": rng.gen_bool(0.75),
        "sexo": if female { "FEMENINO" } else { "MASCULINO" },
    })
}

fn level_for(pct_of_ideal: f64, bueno: f64, muy_bueno: f64) -> &'static str {
    if pct_of_ideal >= muy_bueno {
        "MUY BUENO"
    } else if pct_of_ideal >= bueno {
        "BUENO"
    } else if pct_of_ideal >= 60.0 {
        "REGULAR"
    } else {
        "BAJO"
    }
}

fn cell_class(val: i64, monthly_goal: f64) -> &'static str {
    if monthly_goal <= 0.0 {
        return "";
    }
    let ratio = val as f64 / monthly_goal;
    if ratio >= 1.0 {
        "verde"
    } else if ratio >= 0.8 {
        "amarillo"
    } else {
        "rojo"
    }
}

fn current_period() -> (i32, u32) {
    use chrono::Datelike;
    let today = Utc::now().date_naive();
    (today.year(), today.month())
}

fn authorize(state: &DemoState, req: &HttpRequest) -> Option<i64> {
    let token = req.bearer.as_deref()?;
    if !state.access_tokens.contains(token) {
        return None;
    }
    token.rsplit(':').next()?.parse().ok()
}

fn issue_tokens(state: &mut DemoState, user: &DemoUser) -> Value {
    let n = state.next_token;
    state.next_token += 1;
    let access = format!("demo-access-{n}:{}", user.id);
    let refresh = format!("demo-refresh-{n}:{}", user.id);
    state.access_tokens.insert(access.clone());
    state.refresh_tokens.insert(refresh.clone(), user.id);
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "user": user.to_json(),
    })
}

fn login(state: &mut DemoState, body: &Value) -> HttpResponse {
    let email = body["email"].as_str().unwrap_or_default().trim().to_lowercase();
    let password = body["password"].as_str().unwrap_or_default();
    let Some(user) = state
        .users
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned()
    else {
        return unauthorized("Credenciales inválidas");
    };
    if !user.is_active {
        return unauthorized("Usuario inactivo");
    }
    let payload = issue_tokens(state, &user);
    ok_enveloped(payload, "Inicio de sesión exitoso")
}

fn register(state: &mut DemoState, body: &Value) -> HttpResponse {
    let name = body["name"].as_str().unwrap_or_default().trim().to_string();
    let email = body["email"].as_str().unwrap_or_default().trim().to_lowercase();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut problems = Vec::new();
    if name.is_empty() {
        problems.push("name should not be empty");
    }
    if !email.contains('@') {
        problems.push("email must be an email");
    }
    if password.len() < 6 {
        problems.push("password must be longer than or equal to 6 characters");
    }
    if !problems.is_empty() {
        return HttpResponse::json(
            400,
            &json!({ "statusCode": 400, "message": problems, "error": "Bad Request" }),
        );
    }
    if state.users.iter().any(|u| u.email == email) {
        return HttpResponse::json(
            409,
            &json!({ "statusCode": 409, "message": "El email ya está registrado" }),
        );
    }
    let user = DemoUser {
        id: state.users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
        name,
        email,
        password,
        role: body["role"].as_str().unwrap_or("user").to_string(),
        is_active: true,
    };
    state.users.push(user.clone());
    let payload = issue_tokens(state, &user);
    ok_enveloped(payload, "Usuario registrado exitosamente")
}

fn refresh(state: &mut DemoState, body: &Value) -> HttpResponse {
    let token = body["refresh_token"].as_str().unwrap_or_default();
    let Some(user_id) = state.refresh_tokens.get(token).copied() else {
        return unauthorized("Refresh token inválido");
    };
    let n = state.next_token;
    state.next_token += 1;
    let access = format!("demo-access-{n}:{user_id}");
    state.access_tokens.insert(access.clone());
    ok_raw(json!({ "access_token": access }))
}

fn change_password(state: &mut DemoState, user_id: i64, body: &Value) -> HttpResponse {
    let current = body["currentPassword"].as_str().unwrap_or_default();
    let new = body["newPassword"].as_str().unwrap_or_default();
    let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
        return not_found("Usuario no encontrado");
    };
    if user.password != current {
        return bad_request("La contraseña actual es incorrecta");
    }
    if new.len() < 6 {
        return bad_request("La nueva contraseña debe tener al menos 6 caracteres");
    }
    user.password = new.to_string();
    ok_enveloped(Value::Null, "Contraseña actualizada")
}

fn create_solicitud(state: &mut DemoState, mut body: Value) -> HttpResponse {
    let phone_ok = body["telefono_juez"]
        .as_str()
        .is_some_and(|p| !p.trim().is_empty());
    if !phone_ok {
        return bad_request("telefono_juez es requerido");
    }
    let id = state.next_solicitud;
    state.next_solicitud += 1;
    if let Some(map) = body.as_object_mut() {
        map.insert("id".to_string(), json!(id));
        map.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));
    }
    state.solicitudes.push(body.clone());
    HttpResponse::json(201, &json!({
        "success": true,
        "data": body,
        "message": "Solicitud registrada",
        "solicitudId": id,
    }))
}

fn users_route(
    state: &mut DemoState,
    user_id: i64,
    method: Method,
    segments: &[&str],
    req: &HttpRequest,
    body: Value,
) -> HttpResponse {
    match (method, segments) {
        (Method::Get, ["users"]) => ok_raw(Value::Array(
            state.users.iter().map(DemoUser::to_json).collect(),
        )),
        (Method::Post, ["users"]) => {
            let email = body["email"].as_str().unwrap_or_default().trim().to_lowercase();
            if email.is_empty() || state.users.iter().any(|u| u.email == email) {
                return bad_request("Email inválido o duplicado");
            }
            let user = DemoUser {
                id: state.users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
                name: body["name"].as_str().unwrap_or_default().to_string(),
                email,
                password: body["password"].as_str().unwrap_or_default().to_string(),
                role: body["role"].as_str().unwrap_or("user").to_string(),
                is_active: body["isActive"].as_bool().unwrap_or(true),
            };
            state.users.push(user.clone());
            HttpResponse::json(201, &user.to_json())
        }
        (Method::Get, ["users", "profile", "me"]) => {
            match state.users.iter().find(|u| u.id == user_id) {
                Some(user) => ok_raw(json!({
                    "message": "Perfil obtenido",
                    "user": user.to_json(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
                None => not_found("Usuario no encontrado"),
            }
        }
        (Method::Get, ["users", "search"]) => {
            let email = req.query_value("email").map(str::to_lowercase);
            let role = req.query_value("role");
            let found = state
                .users
                .iter()
                .filter(|u| email.as_deref().is_none_or(|e| u.email.contains(e)))
                .filter(|u| role.is_none_or(|r| u.role == r))
                .map(DemoUser::to_json)
                .collect();
            ok_raw(Value::Array(found))
        }
        (_, ["users", id]) => {
            let Ok(id) = id.parse::<i64>() else {
                return bad_request("Id inválido");
            };
            let Some(pos) = state.users.iter().position(|u| u.id == id) else {
                return not_found("Usuario no encontrado");
            };
            match method {
                Method::Get => ok_raw(state.users[pos].to_json()),
                Method::Patch | Method::Put => {
                    let user = &mut state.users[pos];
                    if let Some(name) = body["name"].as_str() {
                        user.name = name.to_string();
                    }
                    if let Some(email) = body["email"].as_str() {
                        user.email = email.trim().to_lowercase();
                    }
                    if let Some(role) = body["role"].as_str() {
                        user.role = role.to_string();
                    }
                    if let Some(active) = body["isActive"].as_bool() {
                        user.is_active = active;
                    }
                    ok_raw(user.to_json())
                }
                Method::Delete => {
                    state.users.remove(pos);
                    ok_enveloped(Value::Null, "Usuario eliminado")
                }
                Method::Post => not_found("Ruta no encontrada"),
            }
        }
        _ => not_found("Ruta no encontrada"),
    }
}

fn ok_enveloped(data: Value, message: &str) -> HttpResponse {
    HttpResponse::json(200, &json!({ "success": true, "data": data, "message": message }))
}

fn ok_raw(data: Value) -> HttpResponse {
    HttpResponse::json(200, &data)
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::json(
        400,
        &json!({ "statusCode": 400, "message": message, "error": "Bad Request" }),
    )
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::json(401, &json!({ "statusCode": 401, "message": message }))
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::json(404, &json!({ "statusCode": 404, "message": message }))
}
