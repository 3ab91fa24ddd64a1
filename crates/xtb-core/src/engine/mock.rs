//! An in-memory engine honouring the xtb C API contract.
//!
//! Results are a smooth analytic stand-in for the tight-binding energy so that
//! gradients and dipoles are deterministic and consistent with the geometry.
//! Every handle is heap-allocated, which makes leaks and release order observable.

use super::api::{
    CalculatorData, CalculatorHandle, EnvironmentData, EnvironmentHandle, MoleculeData,
    MoleculeHandle, ResultsData, ResultsHandle, XTB_API_VERSION, XtbApi,
};
use super::config::{Method, Verbosity};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::os::raw::c_int;

const MAX_ATOMIC_NUMBER: c_int = 86;
const CONFINEMENT: f64 = 1.0e-3;
const SPIN_PENALTY: f64 = 1.0e-2;
const CHARGE_SHIFT: f64 = 0.1;

/// A native entry point, as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    NewEnvironment,
    NewCalculator,
    NewResults,
    NewMolecule,
    UpdateMolecule,
    SetVerbosity,
    LoadMethod,
    SetAccuracy,
    SetMaxIterations,
    SetElectronicTemperature,
    Singlepoint,
    GetEnergy,
    GetDipole,
    GetGradient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Environment,
    Molecule,
    Calculator,
    Results,
}

/// Calculator settings most recently applied through the API.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MockSettings {
    pub accuracy: Option<f64>,
    pub max_iterations: Option<c_int>,
    pub electronic_temperature: Option<f64>,
}

struct MockEnvironment {
    errors: Vec<String>,
}

struct MockMolecule {
    numbers: Vec<c_int>,
    positions: Vec<f64>,
    charge: f64,
    uhf: c_int,
}

struct MockCalculator {
    method: Option<Method>,
    natoms: usize,
}

#[derive(Default)]
struct MockResults {
    energy: Option<f64>,
    gradient: Vec<f64>,
    dipole: [f64; 3],
}

pub struct MockEngine {
    api_version: c_int,
    failures: HashSet<MockCall>,
    live: Cell<usize>,
    allocations: Cell<usize>,
    release_log: RefCell<Vec<HandleKind>>,
    calls: RefCell<Vec<MockCall>>,
    reports_shown: Cell<usize>,
    verbosity: Cell<Option<Verbosity>>,
    loaded_method: Cell<Option<Method>>,
    settings: Cell<MockSettings>,
    singlepoints: Cell<usize>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            api_version: XTB_API_VERSION,
            failures: HashSet::new(),
            live: Cell::new(0),
            allocations: Cell::new(0),
            release_log: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            reports_shown: Cell::new(0),
            verbosity: Cell::new(None),
            loaded_method: Cell::new(None),
            settings: Cell::new(MockSettings::default()),
            singlepoints: Cell::new(0),
        }
    }

    /// Reports `version` from the version query.
    pub fn with_api_version(mut self, version: c_int) -> Self {
        self.api_version = version;
        self
    }

    /// Makes `call` record an error on the environment. Constructors of
    /// environments, calculators and results cannot fail and ignore this.
    pub fn fail_on(mut self, call: MockCall) -> Self {
        self.failures.insert(call);
        self
    }

    pub fn live_handles(&self) -> usize {
        self.live.get()
    }

    pub fn total_allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn release_log(&self) -> Vec<HandleKind> {
        self.release_log.borrow().clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }

    pub fn reports_shown(&self) -> usize {
        self.reports_shown.get()
    }

    pub fn verbosity(&self) -> Option<Verbosity> {
        self.verbosity.get()
    }

    pub fn loaded_method(&self) -> Option<Method> {
        self.loaded_method.get()
    }

    pub fn settings(&self) -> MockSettings {
        self.settings.get()
    }

    pub fn singlepoints_run(&self) -> usize {
        self.singlepoints.get()
    }

    fn record(&self, call: MockCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate<T, D>(&self, value: T) -> *mut D {
        self.live.set(self.live.get() + 1);
        self.allocations.set(self.allocations.get() + 1);
        Box::into_raw(Box::new(value)) as *mut D
    }

    unsafe fn release<T, D>(&self, handle: &mut *mut D, kind: HandleKind) {
        if handle.is_null() {
            return;
        }
        drop(unsafe { Box::from_raw(*handle as *mut T) });
        *handle = std::ptr::null_mut();
        self.live.set(self.live.get() - 1);
        self.release_log.borrow_mut().push(kind);
    }

    /// Records the call and pushes an error if it was marked to fail.
    /// Returns `true` when the call should proceed.
    unsafe fn enter(&self, env: EnvironmentHandle, call: MockCall) -> bool {
        self.record(call);
        if self.failures.contains(&call) {
            unsafe { push_error(env, format!("injected failure in {:?}", call)) };
            return false;
        }
        true
    }
}

unsafe fn environment<'h>(env: EnvironmentHandle) -> Option<&'h mut MockEnvironment> {
    unsafe { (env as *mut MockEnvironment).as_mut() }
}

unsafe fn molecule<'h>(mol: MoleculeHandle) -> Option<&'h mut MockMolecule> {
    unsafe { (mol as *mut MockMolecule).as_mut() }
}

unsafe fn calculator<'h>(calc: CalculatorHandle) -> Option<&'h mut MockCalculator> {
    unsafe { (calc as *mut MockCalculator).as_mut() }
}

unsafe fn results<'h>(res: ResultsHandle) -> Option<&'h mut MockResults> {
    unsafe { (res as *mut MockResults).as_mut() }
}

unsafe fn push_error(env: EnvironmentHandle, message: String) {
    if let Some(env) = unsafe { environment(env) } {
        env.errors.push(message);
    }
}

fn method_scale(method: Method) -> f64 {
    match method {
        Method::Gfn2Xtb => 0.50,
        Method::Gfn1Xtb => 0.51,
        Method::Gfn0Xtb => 0.49,
        Method::GfnFF => 0.05,
    }
}

fn evaluate(mol: &MockMolecule, method: Method) -> MockResults {
    let natoms = mol.numbers.len();
    let scale = method_scale(method);

    let mut energy = -CHARGE_SHIFT * mol.charge + SPIN_PENALTY * mol.uhf as f64;
    let mut gradient = vec![0.0; 3 * natoms];
    let mut dipole = [0.0; 3];
    let shared_charge = mol.charge / natoms as f64;

    for (i, &z) in mol.numbers.iter().enumerate() {
        let r = &mol.positions[3 * i..3 * i + 3];
        let r2: f64 = r.iter().map(|x| x * x).sum();
        energy += -scale * z as f64 + CONFINEMENT * r2;
        let partial_charge = 0.01 * z as f64 - shared_charge;
        for k in 0..3 {
            gradient[3 * i + k] = 2.0 * CONFINEMENT * r[k];
            dipole[k] += partial_charge * r[k];
        }
    }

    MockResults {
        energy: Some(energy),
        gradient,
        dipole,
    }
}

impl XtbApi for MockEngine {
    fn api_version(&self) -> c_int {
        self.api_version
    }

    fn new_environment(&self) -> EnvironmentHandle {
        self.record(MockCall::NewEnvironment);
        self.allocate::<_, EnvironmentData>(MockEnvironment { errors: Vec::new() })
    }

    fn new_calculator(&self) -> CalculatorHandle {
        self.record(MockCall::NewCalculator);
        self.allocate::<_, CalculatorData>(MockCalculator {
            method: None,
            natoms: 0,
        })
    }

    fn new_results(&self) -> ResultsHandle {
        self.record(MockCall::NewResults);
        self.allocate::<_, ResultsData>(MockResults::default())
    }

    unsafe fn new_molecule(
        &self,
        env: EnvironmentHandle,
        numbers: &[c_int],
        positions: &[f64],
        charge: f64,
        uhf: c_int,
    ) -> MoleculeHandle {
        // The handle is allocated even when construction fails, so callers
        // must release it on the error path as well.
        let handle = self.allocate::<_, MoleculeData>(MockMolecule {
            numbers: numbers.to_vec(),
            positions: positions.to_vec(),
            charge,
            uhf,
        });
        if !unsafe { self.enter(env, MockCall::NewMolecule) } {
            return handle;
        }
        if numbers.is_empty() || positions.len() != 3 * numbers.len() {
            unsafe { push_error(env, "Invalid number of atoms or positions".to_string()) };
        } else if let Some(z) = numbers.iter().find(|&&z| !(1..=MAX_ATOMIC_NUMBER).contains(&z)) {
            unsafe { push_error(env, format!("Element {z} is not parametrized")) };
        } else if uhf < 0 {
            unsafe { push_error(env, "Number of unpaired electrons is negative".to_string()) };
        }
        handle
    }

    unsafe fn update_molecule(&self, env: EnvironmentHandle, mol: MoleculeHandle, positions: &[f64]) {
        if !unsafe { self.enter(env, MockCall::UpdateMolecule) } {
            return;
        }
        match unsafe { molecule(mol) } {
            Some(mol) if mol.positions.len() == positions.len() => {
                mol.positions.copy_from_slice(positions);
            }
            Some(_) => unsafe { push_error(env, "Number of atoms changed".to_string()) },
            None => unsafe { push_error(env, "Molecular structure data is not allocated".to_string()) },
        }
    }

    unsafe fn del_environment(&self, env: &mut EnvironmentHandle) {
        unsafe { self.release::<MockEnvironment, _>(env, HandleKind::Environment) }
    }

    unsafe fn del_molecule(&self, mol: &mut MoleculeHandle) {
        unsafe { self.release::<MockMolecule, _>(mol, HandleKind::Molecule) }
    }

    unsafe fn del_calculator(&self, calc: &mut CalculatorHandle) {
        unsafe { self.release::<MockCalculator, _>(calc, HandleKind::Calculator) }
    }

    unsafe fn del_results(&self, res: &mut ResultsHandle) {
        unsafe { self.release::<MockResults, _>(res, HandleKind::Results) }
    }

    unsafe fn check_environment(&self, env: EnvironmentHandle) -> c_int {
        match unsafe { environment(env) } {
            Some(env) => (!env.errors.is_empty()) as c_int,
            None => 1,
        }
    }

    unsafe fn show_environment(&self, env: EnvironmentHandle) {
        self.reports_shown.set(self.reports_shown.get() + 1);
        if let Some(env) = unsafe { environment(env) } {
            for message in env.errors.drain(..) {
                eprintln!("[ERROR] {message}");
            }
        }
    }

    unsafe fn get_error(&self, env: EnvironmentHandle, buffer: &mut [u8]) {
        let Some(last) = buffer.len().checked_sub(1) else {
            return;
        };
        let message = unsafe { environment(env) }
            .map(|env| env.errors.join("\n"))
            .unwrap_or_default();
        let n = message.len().min(last);
        buffer[..n].copy_from_slice(&message.as_bytes()[..n]);
        buffer[n] = 0;
    }

    unsafe fn set_verbosity(&self, env: EnvironmentHandle, verbosity: Verbosity) {
        if unsafe { self.enter(env, MockCall::SetVerbosity) } {
            self.verbosity.set(Some(verbosity));
        }
    }

    unsafe fn load_method(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        method: Method,
    ) {
        if !unsafe { self.enter(env, MockCall::LoadMethod) } {
            return;
        }
        match unsafe { (molecule(mol), calculator(calc)) } {
            (Some(mol), Some(calc)) => {
                calc.method = Some(method);
                calc.natoms = mol.numbers.len();
                self.loaded_method.set(Some(method));
            }
            _ => unsafe { push_error(env, "Molecule or calculator not allocated".to_string()) },
        }
    }

    unsafe fn set_accuracy(&self, env: EnvironmentHandle, _calc: CalculatorHandle, accuracy: f64) {
        if unsafe { self.enter(env, MockCall::SetAccuracy) } {
            let mut settings = self.settings.get();
            settings.accuracy = Some(accuracy);
            self.settings.set(settings);
        }
    }

    unsafe fn set_max_iterations(
        &self,
        env: EnvironmentHandle,
        _calc: CalculatorHandle,
        iterations: c_int,
    ) {
        if unsafe { self.enter(env, MockCall::SetMaxIterations) } {
            let mut settings = self.settings.get();
            settings.max_iterations = Some(iterations);
            self.settings.set(settings);
        }
    }

    unsafe fn set_electronic_temperature(
        &self,
        env: EnvironmentHandle,
        _calc: CalculatorHandle,
        temperature: f64,
    ) {
        if unsafe { self.enter(env, MockCall::SetElectronicTemperature) } {
            let mut settings = self.settings.get();
            settings.electronic_temperature = Some(temperature);
            self.settings.set(settings);
        }
    }

    unsafe fn singlepoint(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        res: ResultsHandle,
    ) {
        if !unsafe { self.enter(env, MockCall::Singlepoint) } {
            return;
        }
        let (Some(mol), Some(calc), Some(res)) =
            (unsafe { (molecule(mol), calculator(calc), results(res)) })
        else {
            unsafe { push_error(env, "Singlepoint called with unallocated data".to_string()) };
            return;
        };
        let Some(method) = calc.method else {
            unsafe { push_error(env, "Calculator is not initialized".to_string()) };
            return;
        };
        if calc.natoms != mol.numbers.len() {
            unsafe { push_error(env, "Calculator was set up for a different molecule".to_string()) };
            return;
        }
        *res = evaluate(mol, method);
        self.singlepoints.set(self.singlepoints.get() + 1);
    }

    unsafe fn get_energy(&self, env: EnvironmentHandle, res: ResultsHandle, energy: &mut f64) {
        if !unsafe { self.enter(env, MockCall::GetEnergy) } {
            return;
        }
        match unsafe { results(res) }.and_then(|res| res.energy) {
            Some(value) => *energy = value,
            None => unsafe { push_error(env, "Energy is not available".to_string()) },
        }
    }

    unsafe fn get_dipole(&self, env: EnvironmentHandle, res: ResultsHandle, dipole: &mut [f64; 3]) {
        if !unsafe { self.enter(env, MockCall::GetDipole) } {
            return;
        }
        match unsafe { results(res) } {
            Some(res) if res.energy.is_some() => *dipole = res.dipole,
            _ => unsafe { push_error(env, "Dipole moment is not available".to_string()) },
        }
    }

    unsafe fn get_gradient(&self, env: EnvironmentHandle, res: ResultsHandle, gradient: &mut [f64]) {
        if !unsafe { self.enter(env, MockCall::GetGradient) } {
            return;
        }
        match unsafe { results(res) } {
            Some(res) if res.energy.is_some() && gradient.len() == res.gradient.len() => {
                gradient.copy_from_slice(&res.gradient);
            }
            Some(res) if res.energy.is_some() => unsafe {
                push_error(env, "Gradient buffer has the wrong size".to_string())
            },
            _ => unsafe { push_error(env, "Gradient is not available".to_string()) },
        }
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        if self.live.get() != 0 && !std::thread::panicking() {
            eprintln!(
                "[WARN] mock xtb engine dropped with {} live handle(s)",
                self.live.get()
            );
        }
    }
}
