//! Context-selector policies (§4.6, §6's `ContextSelector`, §4.13's `ContextSensitivity`).
//!
//! The catalogue here is deliberately small (§1's non-goals exclude a full policy catalogue
//! beyond a handful): an insensitive selector, k-call-site-sensitivity, and k-object-sensitivity.

use super::{Context, ContextElem, CsObj};
use crate::ir::CallSite;
use crate::refs::MethodRef;

/// Produces contexts for callees and allocations from a caller's context (§6's consumed
/// `ContextSelector` interface).
pub trait ContextSelector {
    /// The context the program entry method runs under (`emptyContext`).
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    /// Selects the callee's context for a `STATIC`/`SPECIAL` call (no dynamic receiver).
    fn select_context(
        &self,
        caller_ctx: &Context,
        caller: &MethodRef,
        call_index: usize,
        call: &CallSite,
        callee: &MethodRef,
    ) -> Context;

    /// Selects the callee's context for a `VIRTUAL`/`INTERFACE` call, given the resolved
    /// receiver object (itself context-sensitive).
    fn select_context_virtual(
        &self,
        caller_ctx: &Context,
        caller: &MethodRef,
        call_index: usize,
        call: &CallSite,
        receiver: &CsObj,
        callee: &MethodRef,
    ) -> Context;

    /// Selects the context a newly allocated object is keyed under.
    fn select_heap_context(&self, container_ctx: &Context, container: &MethodRef, site_index: usize) -> Context;
}

/// `Insensitive`: every context is the single empty context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Insensitive;

impl ContextSelector for Insensitive {
    fn select_context(&self, _: &Context, _: &MethodRef, _: usize, _: &CallSite, _: &MethodRef) -> Context {
        Context::empty()
    }
    fn select_context_virtual(&self, _: &Context, _: &MethodRef, _: usize, _: &CallSite, _: &CsObj, _: &MethodRef) -> Context {
        Context::empty()
    }
    fn select_heap_context(&self, _: &Context, _: &MethodRef, _: usize) -> Context {
        Context::empty()
    }
}

/// `k`-call-site-sensitivity (§4.6): the callee's context is the caller's context with the
/// current call site prepended, truncated to `k` elements.
#[derive(Debug, Clone, Copy)]
pub struct CallSiteSensitive {
    /// The truncation depth, conventionally 1 or 2 (§4.13).
    pub k: usize,
}

impl ContextSelector for CallSiteSensitive {
    fn select_context(&self, caller_ctx: &Context, caller: &MethodRef, call_index: usize, _call: &CallSite, _callee: &MethodRef) -> Context {
        caller_ctx.extended(ContextElem::CallSite(caller.clone(), call_index), self.k)
    }

    fn select_context_virtual(
        &self,
        caller_ctx: &Context,
        caller: &MethodRef,
        call_index: usize,
        _call: &CallSite,
        _receiver: &CsObj,
        _callee: &MethodRef,
    ) -> Context {
        caller_ctx.extended(ContextElem::CallSite(caller.clone(), call_index), self.k)
    }

    fn select_heap_context(&self, container_ctx: &Context, _container: &MethodRef, _site_index: usize) -> Context {
        container_ctx.clone()
    }
}

/// `k`-object-sensitivity (§4.6): the callee's context is the receiver object's own context with
/// the receiver object prepended, truncated to `k`. `STATIC`/`SPECIAL` calls carry no dynamic
/// receiver, so they keep the caller's context unchanged.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSensitive {
    /// The truncation depth.
    pub k: usize,
}

impl ContextSelector for ObjectSensitive {
    fn select_context(&self, caller_ctx: &Context, _caller: &MethodRef, _call_index: usize, _call: &CallSite, _callee: &MethodRef) -> Context {
        caller_ctx.clone()
    }

    fn select_context_virtual(
        &self,
        _caller_ctx: &Context,
        _caller: &MethodRef,
        _call_index: usize,
        _call: &CallSite,
        receiver: &CsObj,
        _callee: &MethodRef,
    ) -> Context {
        let (recv_ctx, obj) = receiver;
        recv_ctx.extended(ContextElem::Obj(obj.clone()), self.k)
    }

    fn select_heap_context(&self, container_ctx: &Context, _container: &MethodRef, _site_index: usize) -> Context {
        container_ctx.clone()
    }
}
